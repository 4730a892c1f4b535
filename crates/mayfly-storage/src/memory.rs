use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use mayfly_core::error::StorageError;
use mayfly_core::store::{LinkStore, Result};
use mayfly_core::{LinkRecord, ShortCode};
use uuid::Uuid;

/// In-memory implementation of [`LinkStore`] using DashMap.
///
/// DashMap's sharded locks allow concurrent creates and reconciler deletes
/// to proceed without a global lock, matching the production store's
/// per-row behavior closely enough for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, LinkRecord>,
}

impl MemoryLinkStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the store holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn insert(&self, link: &LinkRecord) -> Result<()> {
        match self.links.entry(link.code.as_str().to_owned()) {
            dashmap::Entry::Occupied(_) => Err(StorageError::Conflict(link.code.to_string())),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(link.clone());
                Ok(())
            }
        }
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        Ok(self.links.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn find_by_target_and_owner(
        &self,
        target: &str,
        owner: Option<Uuid>,
    ) -> Result<Option<LinkRecord>> {
        Ok(self
            .links
            .iter()
            .find(|entry| entry.target == target && entry.owner == owner)
            .map(|entry| entry.clone()))
    }

    async fn update_expiry(&self, code: &ShortCode, expires_at: Timestamp) -> Result<bool> {
        match self.links.get_mut(code.as_str()) {
            Some(mut entry) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_code(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.links.remove(code.as_str()).is_some())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.links.contains_key(code.as_str()))
    }

    async fn find_expired(&self, as_of: Timestamp) -> Result<Vec<LinkRecord>> {
        Ok(self
            .links
            .iter()
            .filter(|entry| entry.is_expired(as_of))
            .map(|entry| entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn link(c: &str, target: &str, expires_at: Option<Timestamp>) -> LinkRecord {
        LinkRecord::new(code(c), target, None, expires_at)
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = MemoryLinkStore::new();

        store
            .insert(&link("abc123", "https://example.com", None))
            .await
            .unwrap();

        let found = store.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.target, "https://example.com");
        assert_eq!(found.expires_at, None);
    }

    #[tokio::test]
    async fn find_nonexistent() {
        let store = MemoryLinkStore::new();

        assert!(store.find_by_code(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_conflict() {
        let store = MemoryLinkStore::new();

        store
            .insert(&link("abc123", "https://example.com", None))
            .await
            .unwrap();

        let err = store
            .insert(&link("abc123", "https://other.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_target_and_owner_distinguishes_owners() {
        let store = MemoryLinkStore::new();
        let owner = Uuid::new_v4();

        let mut owned = link("owned1", "https://example.com", None);
        owned.owner = Some(owner);
        store.insert(&owned).await.unwrap();
        store
            .insert(&link("anon01", "https://example.com", None))
            .await
            .unwrap();

        let found = store
            .find_by_target_and_owner("https://example.com", Some(owner))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.code.as_str(), "owned1");

        let found = store
            .find_by_target_and_owner("https://example.com", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.code.as_str(), "anon01");

        let missing = store
            .find_by_target_and_owner("https://example.com", Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_expiry_existing() {
        let store = MemoryLinkStore::new();
        let deadline = Timestamp::now() + SignedDuration::from_hours(1);

        store
            .insert(&link("abc123", "https://example.com", None))
            .await
            .unwrap();

        assert!(store.update_expiry(&code("abc123"), deadline).await.unwrap());
        let found = store.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.expires_at, Some(deadline));
    }

    #[tokio::test]
    async fn update_expiry_missing() {
        let store = MemoryLinkStore::new();
        let deadline = Timestamp::now() + SignedDuration::from_hours(1);

        assert!(!store.update_expiry(&code("nope"), deadline).await.unwrap());
    }

    #[tokio::test]
    async fn delete_existing_and_absent() {
        let store = MemoryLinkStore::new();

        store
            .insert(&link("abc123", "https://example.com", None))
            .await
            .unwrap();

        assert!(store.delete_by_code(&code("abc123")).await.unwrap());
        // Absent delete is success, not an error.
        assert!(!store.delete_by_code(&code("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn exists_checks() {
        let store = MemoryLinkStore::new();

        assert!(!store.exists(&code("abc123")).await.unwrap());
        store
            .insert(&link("abc123", "https://example.com", None))
            .await
            .unwrap();
        assert!(store.exists(&code("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn find_expired_filters_by_deadline() {
        let store = MemoryLinkStore::new();
        let now = Timestamp::now();

        store
            .insert(&link(
                "past01",
                "https://a.example",
                Some(now - SignedDuration::from_secs(5)),
            ))
            .await
            .unwrap();
        store
            .insert(&link(
                "future",
                "https://b.example",
                Some(now + SignedDuration::from_hours(1)),
            ))
            .await
            .unwrap();
        store
            .insert(&link("never1", "https://c.example", None))
            .await
            .unwrap();

        let expired = store.find_expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].code.as_str(), "past01");
    }

    #[tokio::test]
    async fn concurrent_inserts() {
        use std::sync::Arc;

        let store = Arc::new(MemoryLinkStore::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let l = LinkRecord::new(
                    ShortCode::new_unchecked(format!("code-{:03}", i)),
                    format!("https://example{}.com", i),
                    None,
                    None,
                );
                store.insert(&l).await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 10);
    }
}
