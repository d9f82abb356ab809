use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{BlobBackend, StoreError};

/// Process-local backend. Entries with a TTL are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    inner: DashMap<String, (Bytes, Option<Instant>)>,
}

impl MemoryBlobStore {
    /// Removes `key` only if the stored entry is still expired at `now`; a
    /// value written after the expired read is kept.
    fn evict_expired(&self, key: &str, now: Instant) {
        self.inner
            .remove_if(key, |_, (_, expires)| expires.is_some_and(|at| at <= now));
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let Some(entry) = self.inner.get(key) else {
            return Ok(None);
        };
        let now = Instant::now();
        let expires = entry.1;
        match expires {
            Some(at) if at <= now => {
                drop(entry);
                self.evict_expired(key, now);
                Ok(None)
            }
            _ => Ok(Some(entry.0.clone())),
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires = ttl.map(|ttl| Instant::now() + ttl);
        self.inner.insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key);
        Ok(())
    }
}
