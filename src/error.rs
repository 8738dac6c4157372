/// Error types for the studio
///
/// Every failure in this application is recoverable. These types carry
/// enough context to be shown to the user or written to the diagnostic log.

use thiserror::Error;

/// Failures of the local key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the image-generation boundary
///
/// Cloneable so it can travel inside iced messages.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerateError {
    #[error("{0}")]
    Backend(String),

    #[error("generation task failed: {0}")]
    Task(String),
}

/// Failures of the file-save boundary
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DownloadError {
    #[error("failed to fetch image: {0}")]
    Fetch(String),

    #[error("failed to write image: {0}")]
    Write(String),

    #[error("failed to write log export: {0}")]
    Export(String),

    #[error("save cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Fetch(err.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Write(err.to_string())
    }
}
