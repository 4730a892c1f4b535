use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Errors surfaced by [`crate::LinkStore`] implementations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store operation timed out: {0}")]
    Timeout(String),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("store operation failed: {0}")]
    Operation(String),
}

/// Errors surfaced by [`crate::ExpirationTracker`] implementations.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("deadline is not in the future: {0}")]
    InvalidDeadline(String),
    #[error("tracker backend unavailable: {0}")]
    Unavailable(String),
    #[error("tracker operation timed out: {0}")]
    Timeout(String),
    #[error("tracked data is invalid: {0}")]
    InvalidData(String),
    #[error("tracker operation failed: {0}")]
    Operation(String),
}
