use crate::config::CascadeConfig;
use crate::domain::CascadeReport;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{RecordStore, UserFilter, UserMutation};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Post deletion and its cross-record cleanup.
///
/// The only component allowed to touch more than one record kind in a single
/// operation. Users and comments are never deleted here except for the
/// optional comment purge.
#[derive(Clone)]
pub struct CascadeCoordinator {
    store: Arc<dyn RecordStore>,
    config: CascadeConfig,
}

impl CascadeCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, config: CascadeConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, post_id: Uuid) -> ServiceResult<CascadeReport> {
        let result = self.delete_post_inner(post_id).await;
        metrics::observe("delete_post", &result);
        result
    }

    async fn delete_post_inner(&self, post_id: Uuid) -> ServiceResult<CascadeReport> {
        if !self.store.delete_post(post_id).await? {
            return Err(ServiceError::PostNotFound);
        }

        // The post is gone from here on: any failure leaves dangling index entries,
        // which saved-post reads already skip
        let users_pruned = match self
            .store
            .update_users_where(
                UserFilter::SavedPostsContains(post_id),
                UserMutation::PullSavedPost(post_id),
            )
            .await
        {
            Ok(count) => count,
            Err(e) => {
                metrics::partial_write("delete_post");
                error!(
                    %post_id,
                    maybe_applied = true,
                    error = %e,
                    "post deleted but saved_posts pruning failed"
                );
                return Err(e);
            }
        };

        let (comments_purged, orphaned_comments) = if self.config.purge_comments {
            match self.store.delete_comments_by_post(post_id).await {
                Ok(count) => (count, Some(0)),
                Err(e) => {
                    metrics::partial_write("delete_post");
                    error!(
                        %post_id,
                        users_pruned,
                        maybe_applied = true,
                        error = %e,
                        "post deleted but comment purge failed"
                    );
                    return Err(e);
                }
            }
        } else {
            // Deletion and pruning are done; the orphan count is informational only
            match self.store.find_comments_by_post(post_id).await {
                Ok(comments) => {
                    let orphaned = comments.len() as u64;
                    if orphaned > 0 {
                        warn!(%post_id, orphaned, "comments left referencing a deleted post");
                    }
                    (0, Some(orphaned))
                }
                Err(e) => {
                    warn!(%post_id, error = %e, "could not count comments of deleted post");
                    (0, None)
                }
            }
        };

        info!(
            %post_id,
            users_pruned,
            comments_purged,
            orphaned_comments = ?orphaned_comments,
            "post deleted"
        );

        Ok(CascadeReport {
            post_id,
            users_pruned,
            comments_purged,
            orphaned_comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewComment, NewPost, User};
    use crate::repository::MemoryStore;

    async fn seeded() -> (Arc<MemoryStore>, Uuid, User, User) {
        let store = Arc::new(MemoryStore::new());
        let post = store
            .insert_post(NewPost::new(Uuid::new_v4(), "doomed", None))
            .await
            .unwrap();
        let keep = Uuid::new_v4();

        let mut saver = User::new("saver", "Saver");
        saver.saved_posts = vec![keep, post.id];
        let other = User::new("other", "Other");
        store.insert_user(saver.clone()).await.unwrap();
        store.insert_user(other.clone()).await.unwrap();

        store
            .insert_comment(NewComment::new(other.id, post.id, "nice"))
            .await
            .unwrap();
        (store, post.id, saver, other)
    }

    #[tokio::test]
    async fn test_delete_post_prunes_saved_posts() {
        let (store, post_id, saver, _) = seeded().await;
        let cascade = CascadeCoordinator::new(store.clone(), CascadeConfig::default());

        let report = cascade.delete_post(post_id).await.unwrap();

        assert_eq!(report.users_pruned, 1);
        assert_eq!(report.orphaned_comments, Some(1));
        assert_eq!(report.comments_purged, 0);
        assert!(store.get_post(post_id).await.unwrap().is_none());
        let saver = store.get_user(saver.id).await.unwrap().unwrap();
        assert!(!saver.saved_posts.contains(&post_id));
        assert_eq!(saver.saved_posts.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_post_twice() {
        let (store, post_id, _, _) = seeded().await;
        let cascade = CascadeCoordinator::new(store, CascadeConfig::default());

        cascade.delete_post(post_id).await.unwrap();
        let second = cascade.delete_post(post_id).await;
        assert!(matches!(second, Err(ServiceError::PostNotFound)));
    }

    #[tokio::test]
    async fn test_delete_post_purges_comments_when_enabled() {
        let (store, post_id, _, _) = seeded().await;
        let cascade = CascadeCoordinator::new(
            store.clone(),
            CascadeConfig {
                purge_comments: true,
            },
        );

        let report = cascade.delete_post(post_id).await.unwrap();

        assert_eq!(report.comments_purged, 1);
        assert_eq!(report.orphaned_comments, Some(0));
        assert!(store.find_comments_by_post(post_id).await.unwrap().is_empty());
    }
}
