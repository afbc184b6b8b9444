// Process-local escalation store with per-entry expiry.

use crate::core::EscalationStore;
use crate::store::StoreError;
use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use std::time::{Duration, Instant};

const DEFAULT_MAX_CAPACITY: u64 = 100_000;

#[derive(Clone, Debug)]
struct Entry {
    #[allow(dead_code)]
    marker: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An `EscalationStore` backed by a `moka` cache.
///
/// Entries vanish on restart, so this backend does not give the durability
/// guarantees of the Redis store.
pub struct MemoryStore {
    cache: Cache<String, Entry>,
}

impl MemoryStore {
    /// Creates a new `MemoryStore`.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a new `MemoryStore` holding at most `max_capacity` records.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EscalationStore for MemoryStore {
    async fn put(&self, key: &str, marker: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            marker: marker.to_string(),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.cache.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.cache.remove(key).await.is_some())
    }
}
