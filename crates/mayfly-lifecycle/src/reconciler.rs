use jiff::Timestamp;
use mayfly_core::{ExpirationTracker, LinkStore, ShortCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// Settings for [`Reconciler`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ReconcilerSettings {
    /// Time between sweep ticks.
    #[builder(default = Duration::from_secs(60))]
    pub tick_interval: Duration,
    /// Run the store-side audit sweep every N ticks; 0 disables it.
    ///
    /// The audit catches links whose deadline registration failed after a
    /// successful persist: they carry a past `expires_at` in the store but
    /// no tracker entry, so the regular sweep never sees them.
    #[builder(default = 10)]
    pub audit_every_ticks: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Counters for one reconciler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Due codes whose link was deleted (or found already gone).
    pub deleted: u64,
    /// Due codes skipped because the persisted deadline was superseded.
    pub skipped: u64,
    /// Codes whose delete or lookup failed; retried next tick.
    pub failed: u64,
    /// Links deleted by the audit sweep.
    pub audited: u64,
}

impl TickSummary {
    fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Periodic sweep that deletes expired links from the persistent store.
///
/// The tracker is a trigger, not truth: before deleting, each due code's
/// persisted `expires_at` is re-read and the delete only proceeds if it is
/// still in the past. This closes the race where a reschedule lands after
/// `list_due` snapshotted the code but before the delete, which would
/// otherwise kill a link meant to survive.
///
/// Failure semantics are at-least-once: a failed delete leaves the tracker
/// entry in place and the code is reconsidered next tick. Deleting an
/// already-absent link is success.
pub struct Reconciler<S, T> {
    store: Arc<S>,
    tracker: Arc<T>,
    settings: ReconcilerSettings,
    ticks: AtomicU64,
}

impl<S: LinkStore, T: ExpirationTracker> Reconciler<S, T> {
    /// Creates a reconciler with default settings.
    pub fn new(store: Arc<S>, tracker: Arc<T>) -> Self {
        Self::with_settings(store, tracker, ReconcilerSettings::default())
    }

    /// Creates a reconciler with custom settings.
    pub fn with_settings(store: Arc<S>, tracker: Arc<T>, settings: ReconcilerSettings) -> Self {
        Self {
            store,
            tracker,
            settings,
            ticks: AtomicU64::new(0),
        }
    }

    /// Runs the sweep loop forever. Ticks never overlap; a late tick runs
    /// as soon as the previous one finishes (missed ticks coalesce).
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval = ?self.settings.tick_interval,
            audit_every_ticks = self.settings.audit_every_ticks,
            "reconciler started"
        );

        loop {
            ticker.tick().await;
            let summary = self.tick().await;
            if !summary.is_idle() {
                info!(
                    deleted = summary.deleted,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    audited = summary.audited,
                    "reconciler tick complete"
                );
            }
        }
    }

    /// Spawns the sweep loop as a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Executes one sweep cycle. Never returns an error: every per-code
    /// failure is logged and retried on a later tick.
    pub async fn tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();

        self.sweep_due(&mut summary).await;

        let cadence = self.settings.audit_every_ticks;
        if cadence > 0 {
            let tick_no = self.ticks.fetch_add(1, Ordering::Relaxed);
            if tick_no % u64::from(cadence) == 0 {
                self.audit(&mut summary).await;
            }
        }

        summary
    }

    async fn sweep_due(&self, summary: &mut TickSummary) {
        let due = match self.tracker.list_due().await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "failed to list due codes; will retry next tick");
                return;
            }
        };
        if due.is_empty() {
            return;
        }

        debug!(due = due.len(), "sweeping due codes");
        for code in &due {
            match self.sweep_code(code).await {
                SweepOutcome::Deleted => summary.deleted += 1,
                SweepOutcome::Skipped => summary.skipped += 1,
                SweepOutcome::Failed => summary.failed += 1,
            }
        }
    }

    /// Re-reads the persisted deadline for `code` and deletes the link only
    /// if it is still past. Both the due sweep and the audit sweep go
    /// through here: any snapshot of "expired" codes is stale by the time
    /// it is acted on, so the re-check must sit next to the delete itself.
    async fn sweep_code(&self, code: &ShortCode) -> SweepOutcome {
        let link = match self.store.find_by_code(code).await {
            Ok(link) => link,
            Err(e) => {
                warn!(code = %code, error = %e, "failed to re-read link; will retry next tick");
                return SweepOutcome::Failed;
            }
        };

        match link {
            // Already gone (e.g. deleted manually in the interim). The goal
            // state is reached; just drop the entry.
            None => {
                debug!(code = %code, "due link already absent");
                self.drop_entry(code).await
            }
            Some(link) if link.is_expired(Timestamp::now()) => {
                match self.store.delete_by_code(code).await {
                    Ok(existed) => {
                        debug!(code = %code, existed, "deleted expired link");
                        self.drop_entry(code).await
                    }
                    Err(e) => {
                        warn!(code = %code, error = %e, "delete failed; entry retained for next tick");
                        SweepOutcome::Failed
                    }
                }
            }
            // The persisted deadline was pushed out (or never committed as
            // past). Re-sync the tracker with the store and move on.
            Some(link) => {
                debug!(code = %code, expires_at = ?link.expires_at, "deadline superseded, skipping delete");
                let resync = match link.expires_at {
                    Some(deadline) => self.tracker.register(code, deadline).await,
                    None => self.tracker.remove(code).await,
                };
                if let Err(e) = resync {
                    warn!(code = %code, error = %e, "failed to re-sync tracker entry");
                }
                SweepOutcome::Skipped
            }
        }
    }

    /// Removes a reconciled tracker entry, counting the code as deleted.
    /// A failed removal is retried next tick, where the delete-of-absent
    /// path makes the repeat harmless.
    async fn drop_entry(&self, code: &ShortCode) -> SweepOutcome {
        match self.tracker.remove(code).await {
            Ok(()) => SweepOutcome::Deleted,
            Err(e) => {
                warn!(code = %code, error = %e, "failed to remove tracker entry after delete");
                SweepOutcome::Failed
            }
        }
    }

    async fn audit(&self, summary: &mut TickSummary) {
        let expired = match self.store.find_expired(Timestamp::now()).await {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "audit sweep failed to list expired links");
                return;
            }
        };

        for link in expired {
            match self.sweep_code(&link.code).await {
                SweepOutcome::Deleted => {
                    debug!(code = %link.code, "audit sweep deleted expired link");
                    summary.audited += 1;
                }
                SweepOutcome::Skipped => summary.skipped += 1,
                SweepOutcome::Failed => summary.failed += 1,
            }
        }
    }
}

/// Result of reconciling a single code.
enum SweepOutcome {
    /// Link deleted (or already absent) and the tracker entry dropped.
    Deleted,
    /// Persisted deadline no longer past; delete skipped, tracker re-synced.
    Skipped,
    /// Lookup, delete, or entry removal failed; reconsidered next tick.
    Failed,
}
