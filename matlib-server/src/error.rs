//! Error types for matlib-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. SKU already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// matlib-common error, mapped by kind
    #[error(transparent)]
    Common(#[from] matlib_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use matlib_common::Error as E;

        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(err) => {
                let message = err.to_string();
                match err {
                    E::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
                    E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
                    E::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS", message),
                    E::Persistence(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PERSISTENCE_ERROR",
                        message,
                    ),
                    E::ExternalProcess(_) => {
                        (StatusCode::BAD_GATEWAY, "EXTERNAL_PROCESS_ERROR", message)
                    }
                    E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", message),
                    E::Json(_) | E::Config(_) | E::Internal(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
                    }
                }
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
