use crate::allocator::CodeAllocator;
use crate::error::{LifecycleError, Result};
use jiff::Timestamp;
use mayfly_core::link::normalize_target;
use mayfly_core::{ExpirationTracker, LinkRecord, LinkStore, ShortCode, StorageError};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Bound on insert retries after a lost allocation race. Each retry draws a
/// fresh code, so exhausting this means the store is refusing everything.
const INSERT_RETRY_LIMIT: u32 = 3;

/// Parameters for creating a shortened link.
#[derive(Debug, Clone)]
pub struct CreateLink {
    /// The target URL to shorten. Normalized before persisting.
    pub target: String,
    /// The owning user, or `None` for an anonymous link.
    pub owner: Option<Uuid>,
    /// Optional user-chosen alias. Never silently mutated.
    pub custom_alias: Option<ShortCode>,
    /// Optional deadline after which the link is deleted.
    pub expires_at: Option<Timestamp>,
}

/// Outcome of a create call.
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub link: LinkRecord,
    /// `false` when an existing link for the same target and owner was
    /// returned instead of creating a new one.
    pub newly_created: bool,
}

/// Orchestrates the lifecycle flows that touch expiration.
///
/// Ordering invariant: the link is persisted *before* its deadline is
/// registered with the tracker. A tracker entry without a persisted link
/// could trigger a delete of a row that never committed; the reverse — a
/// persisted link whose registration failed — is merely an orphan that the
/// reconciler's audit sweep deletes late, since the store also carries
/// `expires_at`.
#[derive(Debug, Clone)]
pub struct LifecycleService<S, T> {
    store: Arc<S>,
    tracker: Arc<T>,
    allocator: CodeAllocator<S>,
}

impl<S: LinkStore, T: ExpirationTracker> LifecycleService<S, T> {
    /// Creates a service with a default allocator.
    pub fn new(store: Arc<S>, tracker: Arc<T>) -> Self {
        let allocator = CodeAllocator::new(Arc::clone(&store));
        Self::with_allocator(store, tracker, allocator)
    }

    /// Creates a service with a custom allocator.
    pub fn with_allocator(store: Arc<S>, tracker: Arc<T>, allocator: CodeAllocator<S>) -> Self {
        Self {
            store,
            tracker,
            allocator,
        }
    }

    /// Creates a shortened link.
    ///
    /// Without a custom alias, an existing link for the same target and
    /// owner is reused (and rescheduled if a deadline was supplied).
    pub async fn create(&self, request: CreateLink) -> Result<CreatedLink> {
        let target = normalize_target(&request.target)
            .ok_or_else(|| LifecycleError::InvalidTarget(request.target.clone()))?;
        if let Some(deadline) = request.expires_at {
            ensure_future(deadline)?;
        }

        if request.custom_alias.is_none() {
            if let Some(mut existing) = self
                .store
                .find_by_target_and_owner(&target, request.owner)
                .await?
            {
                debug!(code = %existing.code, "target already shortened, reusing link");
                if let Some(deadline) = request.expires_at {
                    self.reschedule(&existing.code, deadline).await?;
                    existing.expires_at = Some(deadline);
                }
                return Ok(CreatedLink {
                    link: existing,
                    newly_created: false,
                });
            }
        }

        for attempt in 0..INSERT_RETRY_LIMIT {
            let code = self.allocator.allocate(request.custom_alias.clone()).await?;
            let link = LinkRecord::new(code, target.clone(), request.owner, request.expires_at);

            match self.store.insert(&link).await {
                Ok(()) => {
                    if let Some(deadline) = request.expires_at {
                        self.register_deadline(&link.code, deadline).await;
                    }
                    debug!(code = %link.code, newly_created = true, "link created");
                    return Ok(CreatedLink {
                        link,
                        newly_created: true,
                    });
                }
                // A custom alias that passed the allocator's check but lost
                // the insert race is a conflict, not a retry candidate.
                Err(StorageError::Conflict(taken)) if request.custom_alias.is_some() => {
                    return Err(LifecycleError::AliasConflict(taken));
                }
                Err(StorageError::Conflict(taken)) => {
                    debug!(code = %taken, attempt, "lost allocation race, retrying with a fresh code");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LifecycleError::AllocationExhausted(INSERT_RETRY_LIMIT))
    }

    /// Updates the expiration of an existing link.
    ///
    /// Safe to call repeatedly: the tracker entry is replaced, last write
    /// wins.
    pub async fn update_expiry(&self, code: &ShortCode, deadline: Timestamp) -> Result<()> {
        ensure_future(deadline)?;
        self.reschedule(code, deadline).await
    }

    /// Persists the new deadline, then re-registers it with the tracker.
    async fn reschedule(&self, code: &ShortCode, deadline: Timestamp) -> Result<()> {
        if !self.store.update_expiry(code, deadline).await? {
            return Err(LifecycleError::NotFound(code.to_string()));
        }
        self.register_deadline(code, deadline).await;
        Ok(())
    }

    /// Registers a deadline, logging instead of failing the request.
    ///
    /// The persisted `expires_at` is already the source of truth at this
    /// point; a missing or stale tracker entry delays deletion until the
    /// audit sweep, and a stale-but-earlier entry is caught by the
    /// reconciler's pre-delete re-check. Neither is worth failing a request
    /// that already committed.
    async fn register_deadline(&self, code: &ShortCode, deadline: Timestamp) {
        match self.tracker.register(code, deadline).await {
            Ok(()) => {}
            Err(e) => {
                error!(
                    code = %code,
                    deadline = %deadline,
                    error = %e,
                    "link persisted but deadline registration failed; audit sweep will reap it"
                );
            }
        }
    }
}

fn ensure_future(deadline: Timestamp) -> Result<()> {
    if deadline <= Timestamp::now() {
        warn!(deadline = %deadline, "rejected non-future expiration deadline");
        return Err(LifecycleError::InvalidDeadline(deadline));
    }
    Ok(())
}
