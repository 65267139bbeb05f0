use super::{AppState, ViewerId};
use crate::error::ServiceResult;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    pub limit: Option<usize>,
}

pub async fn get_feed(
    state: web::Data<AppState>,
    viewer: ViewerId,
    query: web::Query<FeedQueryParams>,
) -> ServiceResult<HttpResponse> {
    let limit = query.limit.unwrap_or_else(|| state.feed.default_limit());
    debug!(viewer_id = %viewer.0, limit, "feed request");

    let posts = state.feed.compose_feed(viewer.0, limit).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_author_posts(
    state: web::Data<AppState>,
    viewer: ViewerId,
    author_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let posts = state
        .feed
        .posts_by_author(viewer.0, author_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}
