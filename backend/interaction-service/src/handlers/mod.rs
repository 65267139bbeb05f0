/// HTTP handlers for interaction endpoints
///
/// The handlers are thin: they read the caller identity supplied upstream,
/// call the engine, and let `ServiceError` pick the status code.
pub mod comments;
pub mod feed;
pub mod posts;

use crate::config::Config;
use crate::repository::RecordStore;
use crate::services::{
    CascadeCoordinator, CommentService, FeedComposer, InteractionService, PostService,
};
use actix_web::{dev::Payload, error::ErrorUnauthorized, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use std::sync::Arc;
use uuid::Uuid;

/// Header carrying the authenticated user id, set by the gateway
pub const VIEWER_HEADER: &str = "x-user-id";

/// Shared engine components handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub interactions: InteractionService,
    pub comments: CommentService,
    pub cascade: CascadeCoordinator,
    pub feed: FeedComposer,
    pub posts: PostService,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self {
            interactions: InteractionService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            cascade: CascadeCoordinator::new(store.clone(), config.cascade.clone()),
            feed: FeedComposer::new(store.clone(), config.feed.clone()),
            posts: PostService::new(store.clone()),
            store,
        }
    }
}

/// Trusted caller identity
#[derive(Debug, Clone, Copy)]
pub struct ViewerId(pub Uuid);

impl FromRequest for ViewerId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let viewer = req
            .headers()
            .get(VIEWER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(ViewerId)
            .ok_or_else(|| ErrorUnauthorized("missing or invalid x-user-id header"));
        ready(viewer)
    }
}

/// Register every API route under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/feed", web::get().to(feed::get_feed))
            .route("/users/{author_id}/posts", web::get().to(feed::get_author_posts))
            .route(
                "/users/{author_id}/posts/{post_id}",
                web::get().to(posts::get_post),
            )
            .route("/posts/saved", web::get().to(posts::get_saved_posts))
            .route("/posts", web::post().to(posts::create_post))
            .route("/posts/{post_id}", web::put().to(posts::edit_post))
            .route("/posts/{post_id}", web::delete().to(posts::delete_post))
            .route("/posts/{post_id}/like", web::post().to(posts::like_post))
            .route("/posts/{post_id}/save", web::post().to(posts::save_post))
            .route(
                "/posts/{post_id}/comments",
                web::get().to(comments::get_post_comments),
            )
            .route(
                "/posts/{post_id}/comments",
                web::post().to(comments::create_comment),
            )
            .route(
                "/posts/{post_id}/comments/{comment_id}",
                web::delete().to(comments::delete_comment),
            ),
    );
}
