/// Error types for interaction-service
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Coarse failure class reported to the request-handling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionFailed,
    StoreUnavailable,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Post is not found")]
    PostNotFound,

    #[error("Comment is not found")]
    CommentNotFound,

    #[error("User is not found")]
    UserNotFound,

    #[error("This post is already liked")]
    AlreadyLiked,

    #[error("This post is already saved")]
    AlreadySaved,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::PostNotFound
            | ServiceError::CommentNotFound
            | ServiceError::UserNotFound => ErrorKind::NotFound,
            ServiceError::AlreadyLiked | ServiceError::AlreadySaved => ErrorKind::Conflict,
            ServiceError::InvalidInput(_) => ErrorKind::PreconditionFailed,
            ServiceError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Label used for the `result` dimension of operation metrics
    pub fn metric_label(&self) -> &'static str {
        match self {
            ServiceError::PostNotFound => "post_not_found",
            ServiceError::CommentNotFound => "comment_not_found",
            ServiceError::UserNotFound => "user_not_found",
            ServiceError::AlreadyLiked => "already_liked",
            ServiceError::AlreadySaved => "already_saved",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::StoreUnavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for ServiceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ServiceError::StoreUnavailable(format!("migration failed: {}", err))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PreconditionFailed => StatusCode::BAD_REQUEST,
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Store details stay in the logs
        let message = match self {
            ServiceError::StoreUnavailable(_) => "Server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": message,
        }))
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ServiceError::PostNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::CommentNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::AlreadyLiked.kind(), ErrorKind::Conflict);
        assert_eq!(ServiceError::AlreadySaved.kind(), ErrorKind::Conflict);
        assert_eq!(
            ServiceError::InvalidInput("text".into()).kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            ServiceError::StoreUnavailable("down".into()).kind(),
            ErrorKind::StoreUnavailable
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::PostNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::AlreadyLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::InvalidInput("blank".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::StoreUnavailable("io".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
