//! Error types for backend operations

use thiserror::Error;

/// Errors reported by a [`Backend`](crate::Backend)
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Subscription cancelled at {path}: {reason}")]
    Cancelled { path: String, reason: String },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// True when the backend gave up watching a location
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled { .. })
    }
}
