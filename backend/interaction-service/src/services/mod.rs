pub mod cascade;
pub mod comments;
pub mod feed;
pub mod interactions;
pub mod posts;
pub mod visibility;

pub use cascade::CascadeCoordinator;
pub use comments::CommentService;
pub use feed::FeedComposer;
pub use interactions::InteractionService;
pub use posts::PostService;
pub use visibility::can_view;

use crate::domain::{AuthorSummary, Post, PostView};
use crate::error::ServiceResult;
use crate::repository::RecordStore;
use std::collections::HashMap;
use uuid::Uuid;

/// Read-side join: author projections keyed by user id
pub(crate) async fn author_summaries(
    store: &dyn RecordStore,
    author_ids: impl IntoIterator<Item = Uuid>,
) -> ServiceResult<HashMap<Uuid, AuthorSummary>> {
    let mut ids: Vec<Uuid> = author_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let users = store.find_users(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u.summary())).collect())
}

pub(crate) async fn attach_authors(
    store: &dyn RecordStore,
    posts: Vec<Post>,
) -> ServiceResult<Vec<PostView>> {
    let authors = author_summaries(store, posts.iter().map(|p| p.author_id)).await?;
    Ok(posts
        .into_iter()
        .map(|post| PostView {
            author: authors.get(&post.author_id).cloned(),
            post,
        })
        .collect())
}
