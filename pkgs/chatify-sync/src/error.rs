use chatify_store::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}
