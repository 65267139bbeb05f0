#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use interaction_service::domain::{Comment, NewComment, NewPost, Post, User};
use interaction_service::error::{ServiceError, ServiceResult};
use interaction_service::repository::{
    MemoryStore, PostMutation, PostQuery, RecordStore, UpdateOutcome, UserFilter, UserMutation,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub async fn seed_user(store: &dyn RecordStore, login: &str) -> User {
    let user = User::new(login, login.to_uppercase());
    store.insert_user(user.clone()).await.unwrap();
    user
}

pub async fn seed_post(store: &dyn RecordStore, author_id: Uuid, text: &str) -> Post {
    store
        .insert_post(NewPost::new(author_id, text, None))
        .await
        .unwrap()
}

pub async fn seed_post_at(
    store: &dyn RecordStore,
    author_id: Uuid,
    text: &str,
    created_at: DateTime<Utc>,
) -> Post {
    store
        .insert_post(NewPost::new(author_id, text, None).at(created_at))
        .await
        .unwrap()
}

/// `count` posts, newest first, one minute apart
pub async fn seed_timeline(store: &dyn RecordStore, author_id: Uuid, count: usize) -> Vec<Post> {
    let now = Utc::now();
    let mut posts = Vec::with_capacity(count);
    for i in 0..count {
        let at = now - Duration::minutes(i as i64);
        posts.push(seed_post_at(store, author_id, &format!("post {}", i + 1), at).await);
    }
    posts
}

pub async fn add_likes(store: &dyn RecordStore, post_id: Uuid, n: usize) {
    for _ in 0..n {
        store
            .update_post(post_id, PostMutation::AddLike(Uuid::new_v4()))
            .await
            .unwrap();
    }
}

fn unavailable() -> ServiceError {
    ServiceError::StoreUnavailable("injected failure".into())
}

/// Memory store with switchable failures on the second step of multi-step writes
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_user_updates: AtomicBool,
    pub fail_comment_counter: AtomicBool,
    pub fail_update_many: AtomicBool,
    pub fail_comment_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordStore for FlakyStore {
    async fn get_user(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>> {
        self.inner.find_users(user_ids).await
    }

    async fn insert_user(&self, user: User) -> ServiceResult<()> {
        self.inner.insert_user(user).await
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        mutation: UserMutation,
    ) -> ServiceResult<UpdateOutcome> {
        if self.fail_user_updates.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.update_user(user_id, mutation).await
    }

    async fn update_users_where(
        &self,
        filter: UserFilter,
        mutation: UserMutation,
    ) -> ServiceResult<u64> {
        if self.fail_update_many.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.update_users_where(filter, mutation).await
    }

    async fn get_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>> {
        self.inner.get_post(post_id).await
    }

    async fn find_posts_by_ids(&self, post_ids: &[Uuid]) -> ServiceResult<Vec<Post>> {
        self.inner.find_posts_by_ids(post_ids).await
    }

    async fn find_posts(&self, query: PostQuery) -> ServiceResult<Vec<Post>> {
        self.inner.find_posts(query).await
    }

    async fn insert_post(&self, post: NewPost) -> ServiceResult<Post> {
        self.inner.insert_post(post).await
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        mutation: PostMutation,
    ) -> ServiceResult<UpdateOutcome> {
        if matches!(mutation, PostMutation::IncrementComments(_))
            && self.fail_comment_counter.load(Ordering::SeqCst)
        {
            return Err(unavailable());
        }
        self.inner.update_post(post_id, mutation).await
    }

    async fn delete_post(&self, post_id: Uuid) -> ServiceResult<bool> {
        self.inner.delete_post(post_id).await
    }

    async fn get_comment(&self, comment_id: Uuid) -> ServiceResult<Option<Comment>> {
        self.inner.get_comment(comment_id).await
    }

    async fn find_comments_by_post(&self, post_id: Uuid) -> ServiceResult<Vec<Comment>> {
        if self.fail_comment_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.find_comments_by_post(post_id).await
    }

    async fn insert_comment(&self, comment: NewComment) -> ServiceResult<Comment> {
        self.inner.insert_comment(comment).await
    }

    async fn delete_comment(&self, comment_id: Uuid) -> ServiceResult<bool> {
        self.inner.delete_comment(comment_id).await
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> ServiceResult<u64> {
        self.inner.delete_comments_by_post(post_id).await
    }
}
