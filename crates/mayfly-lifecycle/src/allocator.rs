use crate::error::{LifecycleError, Result};
use mayfly_core::{LinkStore, ShortCode};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Settings for [`CodeAllocator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct AllocatorSettings {
    /// Length of generated codes. 8 alphanumeric characters gives a
    /// collision probability of ~1/62^8 per draw.
    #[builder(default = 8)]
    pub code_length: usize,
    /// Attempts before giving up on random generation. Repeated collisions
    /// at this rate mean the existence check is lying (store distress),
    /// not bad luck.
    #[builder(default = 10)]
    pub max_attempts: u32,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Allocates short codes against a [`LinkStore`].
///
/// Allocation only performs existence checks; the caller persists the link
/// and must treat an insert-time uniqueness violation as a lost race to be
/// retried with a fresh code, not a user-facing error.
#[derive(Debug, Clone)]
pub struct CodeAllocator<S> {
    store: Arc<S>,
    settings: AllocatorSettings,
}

impl<S: LinkStore> CodeAllocator<S> {
    /// Creates an allocator with default settings.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_settings(store, AllocatorSettings::default())
    }

    /// Creates an allocator with custom settings.
    pub fn with_settings(store: Arc<S>, settings: AllocatorSettings) -> Self {
        Self { store, settings }
    }

    /// Allocates a short code.
    ///
    /// With a `preferred` alias: returns it unchanged if unused, or
    /// [`LifecycleError::AliasConflict`] if taken. The requested alias is
    /// never silently mutated.
    ///
    /// Without one: draws random candidates until an unused code is found,
    /// bounded by `max_attempts`, then [`LifecycleError::AllocationExhausted`].
    pub async fn allocate(&self, preferred: Option<ShortCode>) -> Result<ShortCode> {
        if let Some(code) = preferred {
            if self.store.exists(&code).await? {
                return Err(LifecycleError::AliasConflict(code.to_string()));
            }
            return Ok(code);
        }

        for attempt in 0..self.settings.max_attempts {
            let candidate = self.random_code();
            if !self.store.exists(&candidate).await? {
                trace!(code = %candidate, attempt, "allocated short code");
                return Ok(candidate);
            }
            debug!(code = %candidate, attempt, "generated code already taken, retrying");
        }

        Err(LifecycleError::AllocationExhausted(
            self.settings.max_attempts,
        ))
    }

    fn random_code(&self) -> ShortCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.settings.code_length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use mayfly_core::store::Result as StoreResult;
    use mayfly_core::LinkRecord;
    use mayfly_storage::MemoryLinkStore;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn allocator() -> CodeAllocator<MemoryLinkStore> {
        CodeAllocator::new(Arc::new(MemoryLinkStore::new()))
    }

    #[tokio::test]
    async fn generated_codes_have_fixed_length() {
        let allocator = allocator();

        let code = allocator.allocate(None).await.unwrap();
        assert_eq!(code.as_str().len(), 8);
        assert!(code.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn concurrent_allocations_are_distinct() {
        let store = Arc::new(MemoryLinkStore::new());
        let allocator = Arc::new(CodeAllocator::new(Arc::clone(&store)));
        let mut handles = vec![];

        for _ in 0..32 {
            let allocator = Arc::clone(&allocator);
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let code = allocator.allocate(None).await.unwrap();
                // Persist so later allocations observe it.
                store
                    .insert(&LinkRecord::new(
                        code.clone(),
                        "https://example.com",
                        None,
                        None,
                    ))
                    .await
                    .unwrap();
                code
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let code = handle.await.unwrap();
            assert!(seen.insert(code.as_str().to_owned()), "duplicate code");
        }
        assert_eq!(seen.len(), 32);
    }

    #[tokio::test]
    async fn preferred_alias_returned_unchanged() {
        let allocator = allocator();
        let alias = ShortCode::new("my-alias").unwrap();

        let code = allocator.allocate(Some(alias.clone())).await.unwrap();
        assert_eq!(code, alias);
    }

    #[tokio::test]
    async fn taken_alias_conflicts() {
        let store = Arc::new(MemoryLinkStore::new());
        store
            .insert(&LinkRecord::new(
                ShortCode::new_unchecked("abc"),
                "https://example.com",
                None,
                None,
            ))
            .await
            .unwrap();
        let allocator = CodeAllocator::new(store);

        let err = allocator
            .allocate(Some(ShortCode::new("abc").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::AliasConflict(_)));
    }

    /// A store whose existence check always reports "taken", simulating a
    /// collision storm (or an outage masquerading as one).
    struct SaturatedStore;

    #[async_trait]
    impl LinkStore for SaturatedStore {
        async fn insert(&self, _link: &LinkRecord) -> StoreResult<()> {
            unimplemented!("allocator never inserts")
        }
        async fn find_by_code(&self, _code: &ShortCode) -> StoreResult<Option<LinkRecord>> {
            Ok(None)
        }
        async fn find_by_target_and_owner(
            &self,
            _target: &str,
            _owner: Option<Uuid>,
        ) -> StoreResult<Option<LinkRecord>> {
            Ok(None)
        }
        async fn update_expiry(
            &self,
            _code: &ShortCode,
            _expires_at: Timestamp,
        ) -> StoreResult<bool> {
            Ok(false)
        }
        async fn delete_by_code(&self, _code: &ShortCode) -> StoreResult<bool> {
            Ok(false)
        }
        async fn exists(&self, _code: &ShortCode) -> StoreResult<bool> {
            Ok(true)
        }
        async fn find_expired(&self, _as_of: Timestamp) -> StoreResult<Vec<LinkRecord>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn collision_storm_exhausts_allocation() {
        let settings = AllocatorSettings::builder().max_attempts(5).build();
        let allocator = CodeAllocator::with_settings(Arc::new(SaturatedStore), settings);

        let err = allocator.allocate(None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::AllocationExhausted(5)));
    }
}
