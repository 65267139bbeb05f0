use crate::domain::PostView;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{PostMutation, RecordStore, UpdateOutcome, UserMutation};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Like/save engine.
///
/// Membership truth lives on the post (`likes_list`, `saves_list`). The user's
/// `saved_posts` is a secondary index, written second and never trusted alone.
#[derive(Clone)]
pub struct InteractionService {
    store: Arc<dyn RecordStore>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Like a post once. A repeated call fails with `AlreadyLiked`, including
    /// a retry of a call that already succeeded.
    #[instrument(skip(self))]
    pub async fn like(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<()> {
        let result = match self
            .store
            .update_post(post_id, PostMutation::AddLike(viewer_id))
            .await
        {
            Ok(UpdateOutcome::Applied) => {
                info!(%post_id, %viewer_id, "post liked");
                Ok(())
            }
            Ok(UpdateOutcome::Unchanged) => Err(ServiceError::AlreadyLiked),
            Ok(UpdateOutcome::Missing) => Err(ServiceError::PostNotFound),
            Err(e) => Err(e),
        };

        metrics::observe("like", &result);
        result
    }

    /// Save a post: add the viewer to `saves_list`, then append the post to the
    /// viewer's `saved_posts` index.
    #[instrument(skip(self))]
    pub async fn save(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<()> {
        let result = self.save_inner(viewer_id, post_id).await;
        metrics::observe("save", &result);
        result
    }

    async fn save_inner(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<()> {
        match self
            .store
            .update_post(post_id, PostMutation::AddSave(viewer_id))
            .await?
        {
            UpdateOutcome::Applied => {}
            UpdateOutcome::Unchanged => return Err(ServiceError::AlreadySaved),
            UpdateOutcome::Missing => return Err(ServiceError::PostNotFound),
        }

        // saves_list already holds the viewer; failures from here on are "maybe applied"
        let index_result = self
            .store
            .update_user(viewer_id, UserMutation::PushSavedPost(post_id))
            .await;

        match index_result {
            Ok(UpdateOutcome::Applied) | Ok(UpdateOutcome::Unchanged) => {
                info!(%post_id, %viewer_id, "post saved");
                Ok(())
            }
            Ok(UpdateOutcome::Missing) => {
                metrics::partial_write("save");
                error!(
                    %post_id,
                    %viewer_id,
                    maybe_applied = true,
                    "post saves_list updated but viewer record is missing"
                );
                Err(ServiceError::UserNotFound)
            }
            Err(e) => {
                metrics::partial_write("save");
                error!(
                    %post_id,
                    %viewer_id,
                    maybe_applied = true,
                    error = %e,
                    "post saves_list updated but saved_posts index write failed"
                );
                Err(e)
            }
        }
    }

    /// Posts saved by the viewer, in the order they were saved.
    ///
    /// Resolved through the post records: ids whose post is gone, or whose
    /// post no longer lists the viewer in `saves_list`, are skipped.
    #[instrument(skip(self))]
    pub async fn saved_posts(&self, viewer_id: Uuid) -> ServiceResult<Vec<PostView>> {
        let user = self
            .store
            .get_user(viewer_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let posts = self.store.find_posts_by_ids(&user.saved_posts).await?;
        let mut by_id: HashMap<Uuid, _> =
            posts.into_iter().map(|p| (p.id, p)).collect();

        let mut seen = HashSet::new();
        let ordered: Vec<_> = user
            .saved_posts
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| by_id.remove(id))
            .filter(|post| post.is_saved_by(viewer_id))
            .collect();

        let dangling = user.saved_posts.len().saturating_sub(ordered.len());
        if dangling > 0 {
            tracing::debug!(%viewer_id, dangling, "skipped stale saved_posts entries");
        }

        super::attach_authors(self.store.as_ref(), ordered).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPost, User};
    use crate::repository::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, InteractionService, User, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let author = User::new("author", "Author");
        let viewer = User::new("viewer", "Viewer");
        store.insert_user(author.clone()).await.unwrap();
        store.insert_user(viewer.clone()).await.unwrap();
        let post = store
            .insert_post(NewPost::new(author.id, "first post", None))
            .await
            .unwrap();
        let service = InteractionService::new(store.clone());
        (store, service, viewer, post.id)
    }

    #[tokio::test]
    async fn test_like_twice_fails_with_already_liked() {
        let (store, service, viewer, post_id) = setup().await;

        service.like(viewer.id, post_id).await.unwrap();
        let second = service.like(viewer.id, post_id).await;

        assert!(matches!(second, Err(ServiceError::AlreadyLiked)));
        let post = store.get_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.likes_list, vec![viewer.id]);
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let (_, service, viewer, _) = setup().await;
        let result = service.like(viewer.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::PostNotFound)));
    }

    #[tokio::test]
    async fn test_save_updates_post_and_index() {
        let (store, service, viewer, post_id) = setup().await;

        service.save(viewer.id, post_id).await.unwrap();

        let post = store.get_post(post_id).await.unwrap().unwrap();
        let user = store.get_user(viewer.id).await.unwrap().unwrap();
        assert!(post.is_saved_by(viewer.id));
        assert_eq!(user.saved_posts, vec![post_id]);

        let again = service.save(viewer.id, post_id).await;
        assert!(matches!(again, Err(ServiceError::AlreadySaved)));
        let user = store.get_user(viewer.id).await.unwrap().unwrap();
        assert_eq!(user.saved_posts.len(), 1);
    }

    #[tokio::test]
    async fn test_save_with_missing_viewer_keeps_post_authoritative() {
        let (store, service, _, post_id) = setup().await;
        let ghost = Uuid::new_v4();

        let result = service.save(ghost, post_id).await;

        assert!(matches!(result, Err(ServiceError::UserNotFound)));
        let post = store.get_post(post_id).await.unwrap().unwrap();
        assert!(post.is_saved_by(ghost));
    }

    #[tokio::test]
    async fn test_saved_posts_skips_deleted_posts() {
        let (store, service, viewer, post_id) = setup().await;
        let second = store
            .insert_post(NewPost::new(viewer.id, "second", None))
            .await
            .unwrap();

        service.save(viewer.id, post_id).await.unwrap();
        service.save(viewer.id, second.id).await.unwrap();
        store.delete_post(post_id).await.unwrap();

        let saved = service.saved_posts(viewer.id).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].post.id, second.id);
        assert_eq!(saved[0].author.as_ref().map(|a| a.login.as_str()), Some("viewer"));
    }
}
