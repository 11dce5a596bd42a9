// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Every failure a handler can surface. The response body is always
/// `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingCredential(String),

    #[error("{0}")]
    InvalidCredential(String),

    #[error("{0}")]
    LoginFailed(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ApiError::Upstream(msg.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential(_) | ApiError::LoginFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredential(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn error_body_carries_message() {
        let resp = ApiError::not_found("Task not found").error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Task not found");
    }

    #[test]
    fn credential_errors_map_to_distinct_statuses() {
        assert_eq!(
            ApiError::MissingCredential("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::InvalidCredential("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::LoginFailed("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::upstream("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
