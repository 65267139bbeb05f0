/// Post service - authoring and single-post reads
use crate::domain::{NewPost, Post, PostView};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{PostMutation, RecordStore, UpdateOutcome};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn RecordStore>,
}

fn require_text(text: &str) -> ServiceResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::InvalidInput("post text must not be empty".into()));
    }
    Ok(text)
}

impl PostService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Create a post with empty like/save sets. `image` is an opaque path.
    #[instrument(skip(self, text))]
    pub async fn create_post(
        &self,
        author_id: Uuid,
        text: &str,
        image: Option<String>,
    ) -> ServiceResult<Post> {
        let text = require_text(text)?;

        if self.store.get_user(author_id).await?.is_none() {
            return Err(ServiceError::UserNotFound);
        }

        let result = self
            .store
            .insert_post(NewPost::new(author_id, text, image))
            .await;
        if let Ok(post) = &result {
            info!(post_id = %post.id, %author_id, "post created");
        }
        metrics::observe("create_post", &result);
        result
    }

    /// Replace the text; the image is replaced only when a new one is given
    #[instrument(skip(self, text))]
    pub async fn edit_post(
        &self,
        post_id: Uuid,
        text: &str,
        image: Option<String>,
    ) -> ServiceResult<()> {
        let text = require_text(text)?.to_string();

        let result = match self
            .store
            .update_post(post_id, PostMutation::Edit { text, image })
            .await
        {
            Ok(UpdateOutcome::Missing) => Err(ServiceError::PostNotFound),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        metrics::observe("edit_post", &result);
        result
    }

    /// A post, only when it belongs to `author_id`
    #[instrument(skip(self))]
    pub async fn get_post(&self, author_id: Uuid, post_id: Uuid) -> ServiceResult<PostView> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .filter(|p| p.author_id == author_id)
            .ok_or(ServiceError::PostNotFound)?;

        let author = self.store.get_user(author_id).await?.map(|u| u.summary());
        Ok(PostView { post, author })
    }
}
