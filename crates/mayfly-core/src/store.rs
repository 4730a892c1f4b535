use crate::error::StorageError;
use crate::link::LinkRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The authoritative persistent store for link records.
///
/// Uniqueness of short codes is enforced here: `insert` fails with
/// [`StorageError::Conflict`] on a duplicate code, which is the final
/// arbiter for allocation races (the allocator's existence check is only
/// a fast path).
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Inserts a new link. Returns `Err(Conflict)` if the code is taken.
    async fn insert(&self, link: &LinkRecord) -> Result<()>;

    /// Retrieves the link for a given short code, if any.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>>;

    /// Looks up an existing link by target URL and owner.
    ///
    /// `owner = None` matches only anonymous links.
    async fn find_by_target_and_owner(
        &self,
        target: &str,
        owner: Option<Uuid>,
    ) -> Result<Option<LinkRecord>>;

    /// Sets the expiration of an existing link.
    /// Returns `false` if no link with that code exists.
    async fn update_expiry(&self, code: &ShortCode, expires_at: Timestamp) -> Result<bool>;

    /// Deletes the link for a given short code.
    ///
    /// Deleting an absent code is success: returns `Ok(false)`.
    async fn delete_by_code(&self, code: &ShortCode) -> Result<bool>;

    /// Checks whether a short code is already taken.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Lists links whose persisted deadline is at or before `as_of`.
    ///
    /// Used by the reconciler's audit sweep to find links that expired
    /// without a matching tracker entry.
    async fn find_expired(&self, as_of: Timestamp) -> Result<Vec<LinkRecord>>;
}
