//! Error types for matlib-client

use thiserror::Error;

/// Client session errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Common(#[from] matlib_common::Error),

    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Texture load failed for {path}: {reason}")]
    TextureLoad { path: String, reason: String },

    #[error("Mesh not in scene: {0}")]
    UnknownMesh(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
