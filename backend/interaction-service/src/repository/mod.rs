//! Record store access.
//!
//! The engine never coordinates transactions across records. Every guarantee
//! it makes rests on the primitives below being applied by the store as single
//! indivisible operations:
//!
//! - add-if-absent on a post's like/save sets (compare-and-set, never blind append)
//! - atomic numeric delta on `comments_count`
//! - scoped multi-document update and delete by predicate
//!
//! `MemoryStore` backs tests and local runs, `PgStore` backs deployments.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::domain::{Comment, NewComment, NewPost, Post, User};
use crate::error::ServiceResult;
use uuid::Uuid;

/// Single-document mutation of a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostMutation {
    /// Add-if-absent into `likes_list`
    AddLike(Uuid),
    /// Add-if-absent into `saves_list`
    AddSave(Uuid),
    /// Atomic delta on `comments_count`, floored at zero
    IncrementComments(i64),
    /// Replace text; replace image only when one is given
    Edit { text: String, image: Option<String> },
}

/// Single-document mutation of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMutation {
    /// Append to `saved_posts` unless already present
    PushSavedPost(Uuid),
    /// Remove every occurrence from `saved_posts`
    PullSavedPost(Uuid),
}

/// Predicate for multi-document user updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    SavedPostsContains(Uuid),
}

/// What an atomic update did to the target document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No document with that id
    Missing,
    /// Document exists but the mutation's guard did not hold
    Unchanged,
    Applied,
}

/// Post listing query, always ordered newest first (`created_at`, then `seq`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub author_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl PostQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            author_id: None,
            limit: Some(limit),
        }
    }

    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
            limit: None,
        }
    }
}

/// Trait defining the record store operations the engine depends on.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> ServiceResult<Option<User>>;

    /// Fetch several users; missing ids are skipped
    async fn find_users(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>>;

    async fn insert_user(&self, user: User) -> ServiceResult<()>;

    async fn update_user(&self, user_id: Uuid, mutation: UserMutation)
        -> ServiceResult<UpdateOutcome>;

    /// Apply `mutation` to every user matching `filter`; returns how many changed
    async fn update_users_where(
        &self,
        filter: UserFilter,
        mutation: UserMutation,
    ) -> ServiceResult<u64>;

    async fn get_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>>;

    /// Fetch several posts; missing ids are skipped
    async fn find_posts_by_ids(&self, post_ids: &[Uuid]) -> ServiceResult<Vec<Post>>;

    async fn find_posts(&self, query: PostQuery) -> ServiceResult<Vec<Post>>;

    async fn insert_post(&self, post: NewPost) -> ServiceResult<Post>;

    async fn update_post(&self, post_id: Uuid, mutation: PostMutation)
        -> ServiceResult<UpdateOutcome>;

    /// Returns false when the post did not exist
    async fn delete_post(&self, post_id: Uuid) -> ServiceResult<bool>;

    async fn get_comment(&self, comment_id: Uuid) -> ServiceResult<Option<Comment>>;

    /// Comments of a post ordered by `created_at` ascending, then `seq`
    async fn find_comments_by_post(&self, post_id: Uuid) -> ServiceResult<Vec<Comment>>;

    async fn insert_comment(&self, comment: NewComment) -> ServiceResult<Comment>;

    /// Returns false when the comment did not exist
    async fn delete_comment(&self, comment_id: Uuid) -> ServiceResult<bool>;

    /// Delete every comment referencing `post_id`; returns how many were removed
    async fn delete_comments_by_post(&self, post_id: Uuid) -> ServiceResult<u64>;

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(())
    }
}
