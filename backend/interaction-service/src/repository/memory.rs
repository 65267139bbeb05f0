use super::{PostMutation, PostQuery, RecordStore, UpdateOutcome, UserFilter, UserMutation};
use crate::domain::{Comment, NewComment, NewPost, Post, User};
use crate::error::{ServiceError, ServiceResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// In-process record store.
///
/// Each mutation runs while holding the write guard of the record's shard,
/// which makes add-if-absent and numeric deltas indivisible per document.
/// Multi-document updates take one document guard at a time, matching the
/// per-document atomicity a document database gives `updateMany`.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Comment>,
    seq: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn add_if_absent(set: &mut Vec<Uuid>, value: Uuid) -> UpdateOutcome {
    if set.contains(&value) {
        UpdateOutcome::Unchanged
    } else {
        set.push(value);
        UpdateOutcome::Applied
    }
}

fn apply_user_mutation(user: &mut User, mutation: &UserMutation) -> UpdateOutcome {
    match mutation {
        UserMutation::PushSavedPost(post_id) => add_if_absent(&mut user.saved_posts, *post_id),
        UserMutation::PullSavedPost(post_id) => {
            let before = user.saved_posts.len();
            user.saved_posts.retain(|id| id != post_id);
            if user.saved_posts.len() == before {
                UpdateOutcome::Unchanged
            } else {
                UpdateOutcome::Applied
            }
        }
    }
}

fn user_matches(user: &User, filter: &UserFilter) -> bool {
    match filter {
        UserFilter::SavedPostsContains(post_id) => user.saved_posts.contains(post_id),
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }

    async fn insert_user(&self, user: User) -> ServiceResult<()> {
        user.validate()?;
        match self.users.entry(user.id) {
            Entry::Occupied(_) => Err(ServiceError::InvalidInput(format!(
                "user {} already exists",
                user.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        mutation: UserMutation,
    ) -> ServiceResult<UpdateOutcome> {
        match self.users.get_mut(&user_id) {
            Some(mut user) => Ok(apply_user_mutation(&mut user, &mutation)),
            None => Ok(UpdateOutcome::Missing),
        }
    }

    async fn update_users_where(
        &self,
        filter: UserFilter,
        mutation: UserMutation,
    ) -> ServiceResult<u64> {
        let mut changed = 0;
        for mut user in self.users.iter_mut() {
            if user_matches(&user, &filter)
                && apply_user_mutation(&mut user, &mutation) == UpdateOutcome::Applied
            {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn get_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>> {
        Ok(self.posts.get(&post_id).map(|p| p.value().clone()))
    }

    async fn find_posts_by_ids(&self, post_ids: &[Uuid]) -> ServiceResult<Vec<Post>> {
        Ok(post_ids
            .iter()
            .filter_map(|id| self.posts.get(id).map(|p| p.value().clone()))
            .collect())
    }

    async fn find_posts(&self, query: PostQuery) -> ServiceResult<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| query.author_id.map_or(true, |author| p.author_id == author))
            .map(|p| p.value().clone())
            .collect();

        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        if let Some(limit) = query.limit {
            posts.truncate(limit);
        }

        Ok(posts)
    }

    async fn insert_post(&self, post: NewPost) -> ServiceResult<Post> {
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => Err(ServiceError::InvalidInput(format!(
                "post {} already exists",
                post.id
            ))),
            Entry::Vacant(slot) => {
                let record = Post {
                    id: post.id,
                    author_id: post.author_id,
                    text: post.text,
                    image: post.image,
                    likes_list: Vec::new(),
                    saves_list: Vec::new(),
                    comments_count: 0,
                    created_at: post.created_at,
                    seq: self.next_seq(),
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        mutation: PostMutation,
    ) -> ServiceResult<UpdateOutcome> {
        let Some(mut post) = self.posts.get_mut(&post_id) else {
            return Ok(UpdateOutcome::Missing);
        };

        let outcome = match mutation {
            PostMutation::AddLike(user_id) => add_if_absent(&mut post.likes_list, user_id),
            PostMutation::AddSave(user_id) => add_if_absent(&mut post.saves_list, user_id),
            PostMutation::IncrementComments(delta) => {
                post.comments_count = (post.comments_count + delta).max(0);
                UpdateOutcome::Applied
            }
            PostMutation::Edit { text, image } => {
                post.text = text;
                if let Some(image) = image {
                    post.image = Some(image);
                }
                UpdateOutcome::Applied
            }
        };

        Ok(outcome)
    }

    async fn delete_post(&self, post_id: Uuid) -> ServiceResult<bool> {
        Ok(self.posts.remove(&post_id).is_some())
    }

    async fn get_comment(&self, comment_id: Uuid) -> ServiceResult<Option<Comment>> {
        Ok(self.comments.get(&comment_id).map(|c| c.value().clone()))
    }

    async fn find_comments_by_post(&self, post_id: Uuid) -> ServiceResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.value().clone())
            .collect();

        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.seq.cmp(&b.seq))
        });

        Ok(comments)
    }

    async fn insert_comment(&self, comment: NewComment) -> ServiceResult<Comment> {
        match self.comments.entry(comment.id) {
            Entry::Occupied(_) => Err(ServiceError::InvalidInput(format!(
                "comment {} already exists",
                comment.id
            ))),
            Entry::Vacant(slot) => {
                let record = Comment {
                    id: comment.id,
                    author_id: comment.author_id,
                    post_id: comment.post_id,
                    text: comment.text,
                    created_at: comment.created_at,
                    seq: self.next_seq(),
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn delete_comment(&self, comment_id: Uuid) -> ServiceResult<bool> {
        Ok(self.comments.remove(&comment_id).is_some())
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> ServiceResult<u64> {
        let mut purged = 0;
        self.comments.retain(|_, c| {
            let keep = c.post_id != post_id;
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_add_if_absent_is_compare_and_set() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let post = store
            .insert_post(NewPost::new(author, "hello", None))
            .await
            .unwrap();

        let first = store
            .update_post(post.id, PostMutation::AddLike(viewer))
            .await
            .unwrap();
        let second = store
            .update_post(post.id, PostMutation::AddLike(viewer))
            .await
            .unwrap();

        assert_eq!(first, UpdateOutcome::Applied);
        assert_eq!(second, UpdateOutcome::Unchanged);
        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.likes_list, vec![viewer]);
    }

    #[tokio::test]
    async fn test_update_missing_post() {
        let store = MemoryStore::new();
        let outcome = store
            .update_post(Uuid::new_v4(), PostMutation::IncrementComments(1))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[tokio::test]
    async fn test_comment_counter_floors_at_zero() {
        let store = MemoryStore::new();
        let post = store
            .insert_post(NewPost::new(Uuid::new_v4(), "text", None))
            .await
            .unwrap();

        store
            .update_post(post.id, PostMutation::IncrementComments(-1))
            .await
            .unwrap();

        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.comments_count, 0);
    }

    #[tokio::test]
    async fn test_find_posts_orders_by_created_at_then_seq() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let now = Utc::now();

        let older = store
            .insert_post(NewPost::new(author, "older", None).at(now - Duration::minutes(5)))
            .await
            .unwrap();
        let tie_a = store
            .insert_post(NewPost::new(author, "tie a", None).at(now))
            .await
            .unwrap();
        let tie_b = store
            .insert_post(NewPost::new(author, "tie b", None).at(now))
            .await
            .unwrap();

        let posts = store.find_posts(PostQuery::by_author(author)).await.unwrap();
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![tie_b.id, tie_a.id, older.id]);

        let limited = store.find_posts(PostQuery::recent(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, tie_b.id);
    }

    #[tokio::test]
    async fn test_update_users_where_pulls_only_matching() {
        let store = MemoryStore::new();
        let post_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();

        let mut saver = User::new("saver", "Saver");
        saver.saved_posts = vec![other_id, post_id];
        let bystander = User::new("bystander", "Bystander");
        store.insert_user(saver.clone()).await.unwrap();
        store.insert_user(bystander.clone()).await.unwrap();

        let changed = store
            .update_users_where(
                UserFilter::SavedPostsContains(post_id),
                UserMutation::PullSavedPost(post_id),
            )
            .await
            .unwrap();

        assert_eq!(changed, 1);
        let saver = store.get_user(saver.id).await.unwrap().unwrap();
        assert_eq!(saver.saved_posts, vec![other_id]);
    }

    #[tokio::test]
    async fn test_insert_user_rejects_self_follow() {
        let store = MemoryStore::new();
        let mut user = User::new("loop", "Loop");
        user.followers.push(user.id);

        assert!(matches!(
            store.insert_user(user).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_purge_counts_only_its_own_comments_under_concurrent_inserts() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let author = Uuid::new_v4();
        let doomed = Uuid::new_v4();
        let busy = Uuid::new_v4();
        for i in 0..50 {
            store
                .insert_comment(NewComment::new(author, doomed, format!("c{i}")))
                .await
                .unwrap();
        }

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    store
                        .insert_comment(NewComment::new(author, busy, format!("b{i}")))
                        .await
                        .unwrap();
                }
            })
        };

        let purged = store.delete_comments_by_post(doomed).await.unwrap();
        writer.await.unwrap();

        assert_eq!(purged, 50);
        assert_eq!(store.find_comments_by_post(busy).await.unwrap().len(), 500);
    }
}
