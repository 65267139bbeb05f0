/// Comment service - keeps `comments_count` in step with live comment records
use crate::domain::{Comment, CommentView, NewComment};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{PostMutation, RecordStore, UpdateOutcome};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn RecordStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Create a comment, then apply `+1` to the post's counter as a store-side delta
    #[instrument(skip(self, text))]
    pub async fn add(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> ServiceResult<Comment> {
        let result = self.add_inner(author_id, post_id, text).await;
        metrics::observe("add_comment", &result);
        result
    }

    async fn add_inner(&self, author_id: Uuid, post_id: Uuid, text: &str) -> ServiceResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidInput(
                "comment text must not be empty".into(),
            ));
        }

        if self.store.get_post(post_id).await?.is_none() {
            return Err(ServiceError::PostNotFound);
        }

        let comment = self
            .store
            .insert_comment(NewComment::new(author_id, post_id, text))
            .await?;

        match self
            .store
            .update_post(post_id, PostMutation::IncrementComments(1))
            .await
        {
            Ok(UpdateOutcome::Applied) | Ok(UpdateOutcome::Unchanged) => {
                info!(%post_id, comment_id = %comment.id, "comment added");
                Ok(comment)
            }
            Ok(UpdateOutcome::Missing) => {
                metrics::partial_write("add_comment");
                error!(
                    %post_id,
                    comment_id = %comment.id,
                    maybe_applied = true,
                    "comment stored but post disappeared before the counter increment"
                );
                Err(ServiceError::PostNotFound)
            }
            Err(e) => {
                metrics::partial_write("add_comment");
                error!(
                    %post_id,
                    comment_id = %comment.id,
                    maybe_applied = true,
                    error = %e,
                    "comment stored but comments_count increment failed"
                );
                Err(e)
            }
        }
    }

    /// Delete a comment of `post_id` and apply `-1` to that post's counter.
    ///
    /// The delta is issued only by the call that actually removed the record,
    /// so racing removes of the same comment decrement once.
    #[instrument(skip(self))]
    pub async fn remove(&self, post_id: Uuid, comment_id: Uuid) -> ServiceResult<()> {
        let result = self.remove_inner(post_id, comment_id).await;
        metrics::observe("remove_comment", &result);
        result
    }

    async fn remove_inner(&self, post_id: Uuid, comment_id: Uuid) -> ServiceResult<()> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ServiceError::PostNotFound);
        }

        match self.store.get_comment(comment_id).await? {
            Some(comment) if comment.post_id == post_id => {}
            _ => return Err(ServiceError::CommentNotFound),
        }

        if !self.store.delete_comment(comment_id).await? {
            return Err(ServiceError::CommentNotFound);
        }

        match self
            .store
            .update_post(post_id, PostMutation::IncrementComments(-1))
            .await
        {
            Ok(UpdateOutcome::Missing) => {
                // Post deleted concurrently; there is no counter left to correct
                warn!(%post_id, %comment_id, "post vanished before comment counter decrement");
                Ok(())
            }
            Ok(_) => {
                info!(%post_id, %comment_id, "comment removed");
                Ok(())
            }
            Err(e) => {
                metrics::partial_write("remove_comment");
                error!(
                    %post_id,
                    %comment_id,
                    maybe_applied = true,
                    error = %e,
                    "comment deleted but comments_count decrement failed"
                );
                Err(e)
            }
        }
    }

    /// Comments of a post, oldest first, each joined with its author summary
    #[instrument(skip(self))]
    pub async fn list_by_post(&self, post_id: Uuid) -> ServiceResult<Vec<CommentView>> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ServiceError::PostNotFound);
        }

        let comments = self.store.find_comments_by_post(post_id).await?;
        let authors =
            super::author_summaries(self.store.as_ref(), comments.iter().map(|c| c.author_id))
                .await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: authors.get(&comment.author_id).cloned(),
                comment,
            })
            .collect())
    }
}
