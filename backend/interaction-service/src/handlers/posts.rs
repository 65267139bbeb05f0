/// Post handlers - authoring, like/save and deletion
use super::{AppState, ViewerId};
use crate::error::ServiceResult;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

/// Request body for creating or editing a post
#[derive(Deserialize)]
pub struct PostBody {
    pub text: String,
    /// Stored file path produced by the upload layer
    pub image: Option<String>,
}

pub async fn create_post(
    state: web::Data<AppState>,
    viewer: ViewerId,
    body: web::Json<PostBody>,
) -> ServiceResult<HttpResponse> {
    let body = body.into_inner();
    state
        .posts
        .create_post(viewer.0, &body.text, body.image)
        .await?;
    Ok(HttpResponse::Ok().json(true))
}

pub async fn edit_post(
    state: web::Data<AppState>,
    _viewer: ViewerId,
    post_id: web::Path<Uuid>,
    body: web::Json<PostBody>,
) -> ServiceResult<HttpResponse> {
    let body = body.into_inner();
    state
        .posts
        .edit_post(post_id.into_inner(), &body.text, body.image)
        .await?;
    Ok(HttpResponse::Ok().json(true))
}

pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let (author_id, post_id) = path.into_inner();
    let post = state.posts.get_post(author_id, post_id).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn get_saved_posts(
    state: web::Data<AppState>,
    viewer: ViewerId,
) -> ServiceResult<HttpResponse> {
    let posts = state.interactions.saved_posts(viewer.0).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn like_post(
    state: web::Data<AppState>,
    viewer: ViewerId,
    post_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    state.interactions.like(viewer.0, post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(true))
}

pub async fn save_post(
    state: web::Data<AppState>,
    viewer: ViewerId,
    post_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    state.interactions.save(viewer.0, post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(true))
}

pub async fn delete_post(
    state: web::Data<AppState>,
    _viewer: ViewerId,
    post_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    state.cascade.delete_post(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(true))
}
