use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Free-form location attached to a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
}

/// User entity - profile plus social graph and the saved-posts index
///
/// `saved_posts` is a denormalized back-reference kept in insertion order.
/// It may point at posts that no longer exist until the cascade prunes them;
/// `Post::saves_list` is the authoritative membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub name: String,
    pub about: String,
    pub location: Location,
    pub avatar: Option<String>,
    pub is_private: bool,
    pub followers: Vec<Uuid>,
    pub followings: Vec<Uuid>,
    pub black_list: Vec<Uuid>,
    pub saved_posts: Vec<Uuid>,
}

impl User {
    pub fn new(login: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            login: login.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reject self references in the relationship sets
    pub fn validate(&self) -> ServiceResult<()> {
        if self.login.trim().is_empty() {
            return Err(ServiceError::InvalidInput("login must not be empty".into()));
        }

        for (set, label) in [
            (&self.followers, "followers"),
            (&self.followings, "followings"),
            (&self.black_list, "black_list"),
        ] {
            if set.contains(&self.id) {
                return Err(ServiceError::InvalidInput(format!(
                    "user {} cannot appear in its own {}",
                    self.id, label
                )));
            }
        }

        Ok(())
    }

    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            login: self.login.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Post entity
///
/// `likes_list` and `saves_list` have set semantics: the store only ever
/// appends through add-if-absent, so each user id appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub likes_list: Vec<Uuid>,
    pub saves_list: Vec<Uuid>,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    /// Store-assigned insertion sequence, tie-break for equal `created_at`
    pub seq: i64,
}

impl Post {
    pub fn like_count(&self) -> usize {
        self.likes_list.len()
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes_list.contains(&user_id)
    }

    pub fn is_saved_by(&self, user_id: Uuid) -> bool {
        self.saves_list.contains(&user_id)
    }
}

/// Insert payload for a post; the store assigns `seq` and empty interaction sets
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    pub fn new(author_id: Uuid, text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            text: text.into(),
            image,
            created_at: Utc::now(),
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Comment entity - represents a comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub post_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub post_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl NewComment {
    pub fn new(author_id: Uuid, post_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            post_id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Minimal author projection joined onto posts and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub login: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<AuthorSummary>,
}

/// Outcome of a post deletion and its dependent cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub post_id: Uuid,
    pub users_pruned: u64,
    pub comments_purged: u64,
    /// Comments left behind when purging is off; `None` if they could not be counted
    pub orphaned_comments: Option<u64>,
}
