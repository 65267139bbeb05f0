use crate::config::FeedConfig;
use crate::domain::PostView;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{PostQuery, RecordStore};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::visibility::can_view;

#[derive(Clone)]
pub struct FeedComposer {
    store: Arc<dyn RecordStore>,
    config: FeedConfig,
}

impl FeedComposer {
    pub fn new(store: Arc<dyn RecordStore>, config: FeedConfig) -> Self {
        Self { store, config }
    }

    pub fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    /// The `limit` most recent posts, re-ranked by like count within that window.
    ///
    /// Popularity only reorders the recency page; it never pulls older posts
    /// in. The sort is stable, so equal like counts keep recency order. No
    /// block-list filtering happens here.
    #[instrument(skip(self))]
    pub async fn compose_feed(&self, viewer_id: Uuid, limit: usize) -> ServiceResult<Vec<PostView>> {
        let limit = limit.min(self.config.max_limit);
        let result = self.compose_inner(viewer_id, limit).await;
        metrics::observe("compose_feed", &result);
        result
    }

    async fn compose_inner(&self, viewer_id: Uuid, limit: usize) -> ServiceResult<Vec<PostView>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut posts = self.store.find_posts(PostQuery::recent(limit)).await?;
        posts.sort_by(|a, b| b.like_count().cmp(&a.like_count()));
        debug!(%viewer_id, candidates = posts.len(), "feed composed");
        super::attach_authors(self.store.as_ref(), posts).await
    }

    /// Every post by `author_id`, newest first, or nothing when the author has
    /// blocked the viewer.
    #[instrument(skip(self))]
    pub async fn posts_by_author(
        &self,
        viewer_id: Uuid,
        author_id: Uuid,
    ) -> ServiceResult<Vec<PostView>> {
        let author = self
            .store
            .get_user(author_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if !can_view(viewer_id, author.id, &author.black_list) {
            debug!(%viewer_id, %author_id, "viewer is blocked by author");
            return Ok(Vec::new());
        }

        let posts = self.store.find_posts(PostQuery::by_author(author_id)).await?;
        let summary = author.summary();
        Ok(posts
            .into_iter()
            .map(|post| PostView {
                post,
                author: Some(summary.clone()),
            })
            .collect())
    }
}
