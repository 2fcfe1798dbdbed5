//! Common error types for MatLib

use thiserror::Error;

/// Common result type for MatLib operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the server and the client session
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was missing or malformed; raised before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown SKU, missing staging directory, unknown project
    #[error("Not found: {0}")]
    NotFound(String),

    /// SKU already present in the repository (or a confirm is in flight)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Write verification failed; the previous file has been restored
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The PBR generation process failed or could not be started
    #[error("External process error: {0}")]
    ExternalProcess(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for conditions that belong in a per-item batch result
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::AlreadyExists(_)
        )
    }
}
