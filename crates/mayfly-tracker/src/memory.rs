use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use mayfly_core::error::TrackerError;
use mayfly_core::tracker::{ExpirationTracker, Result};
use mayfly_core::ShortCode;

/// In-memory deadline index backed by DashMap.
///
/// `list_due` scans the whole map; the index only ever holds entries for
/// links with a pending deadline, so the scan stays proportional to the
/// number of scheduled expirations, not the number of links.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeadlineIndex {
    deadlines: DashMap<String, Timestamp>,
}

impl MemoryDeadlineIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked deadlines, due or not.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns `true` if no deadlines are tracked.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Returns the tracked deadline for `code`, if any.
    pub fn deadline(&self, code: &ShortCode) -> Option<Timestamp> {
        self.deadlines.get(code.as_str()).map(|entry| *entry)
    }
}

#[async_trait]
impl ExpirationTracker for MemoryDeadlineIndex {
    async fn register(&self, code: &ShortCode, deadline: Timestamp) -> Result<()> {
        if deadline <= Timestamp::now() {
            return Err(TrackerError::InvalidDeadline(deadline.to_string()));
        }

        // Last write wins: a reschedule simply replaces the old deadline.
        self.deadlines.insert(code.as_str().to_owned(), deadline);
        Ok(())
    }

    async fn is_expired(&self, code: &ShortCode) -> Result<bool> {
        Ok(self
            .deadlines
            .get(code.as_str())
            .is_some_and(|deadline| *deadline <= Timestamp::now()))
    }

    async fn list_due(&self) -> Result<Vec<ShortCode>> {
        let now = Timestamp::now();
        Ok(self
            .deadlines
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| ShortCode::new_unchecked(entry.key().clone()))
            .collect())
    }

    async fn remove(&self, code: &ShortCode) -> Result<()> {
        self.deadlines.remove(code.as_str());
        Ok(())
    }
}
