use crate::error::TrackerError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// A deadline index mapping short codes to their expiration deadlines.
///
/// The tracker is a trigger for the reconciler, never the authoritative
/// record of a link: entries are installed when a link acquires a future
/// deadline, replaced on reschedule (last write wins), and removed only
/// after the corresponding delete has succeeded.
///
/// Implementations must not auto-evict entries at their deadline; a due
/// entry stays observable until [`ExpirationTracker::remove`] is called,
/// so that a failed delete can be retried on the next reconciler tick.
/// An absent entry therefore always means "never scheduled, or already
/// reconciled" and is never reported as expired.
#[async_trait]
pub trait ExpirationTracker: Send + Sync + 'static {
    /// Installs or replaces the deadline for `code`.
    ///
    /// `deadline` must be strictly in the future at call time; otherwise
    /// [`TrackerError::InvalidDeadline`] is returned and nothing changes.
    async fn register(&self, code: &ShortCode, deadline: Timestamp) -> Result<()>;

    /// Returns `true` iff a deadline is tracked for `code` and has passed.
    async fn is_expired(&self, code: &ShortCode) -> Result<bool>;

    /// Returns a snapshot of all codes whose deadline has passed.
    ///
    /// Does not remove entries; removal is the caller's job after the
    /// downstream delete succeeds.
    async fn list_due(&self) -> Result<Vec<ShortCode>>;

    /// Removes the entry for `code`. Removing an absent entry is not an
    /// error.
    async fn remove(&self, code: &ShortCode) -> Result<()>;
}
