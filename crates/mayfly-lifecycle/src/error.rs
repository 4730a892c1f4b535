use jiff::Timestamp;
use mayfly_core::{StorageError, TrackerError};
use thiserror::Error;

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("alias already exists: {0}")]
    AliasConflict(String),
    #[error("could not allocate an unused short code after {0} attempts")]
    AllocationExhausted(u32),
    #[error("expiration deadline is not in the future: {0}")]
    InvalidDeadline(Timestamp),
    #[error("invalid target url: {0}")]
    InvalidTarget(String),
    #[error("no link found for short code: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}
