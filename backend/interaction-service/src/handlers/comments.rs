/// Comment handlers - HTTP endpoints for comment operations
use super::{AppState, ViewerId};
use crate::error::ServiceResult;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

/// Request body for creating a comment
#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

pub async fn create_comment(
    state: web::Data<AppState>,
    viewer: ViewerId,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> ServiceResult<HttpResponse> {
    state
        .comments
        .add(viewer.0, post_id.into_inner(), &req.text)
        .await?;
    Ok(HttpResponse::Ok().json(true))
}

pub async fn get_post_comments(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let comments = state.comments.list_by_post(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    _viewer: ViewerId,
    path: web::Path<(Uuid, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    state.comments.remove(post_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(true))
}
