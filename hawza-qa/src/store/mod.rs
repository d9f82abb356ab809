//! Key-value adapter over a blob backend.
//!
//! Backends move opaque bytes with an optional time-to-live. [`KvStore`] layers
//! JSON encoding on top and is the handle the rest of the service shares.
//! A missing key is `Ok(None)`, never an error; transport and status failures
//! propagate to the caller.

mod http;
mod memory;

pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::StoreConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("blob store answered {status} for key {key}")]
    Status {
        key: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid JSON under key {key}: {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },
}

/// Raw byte storage keyed by string.
#[async_trait]
pub trait BlobBackend: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct KvStore {
    backend: Arc<dyn BlobBackend>,
}

impl KvStore {
    pub fn new(backend: impl BlobBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryBlobStore::default())
    }

    /// Build the backend selected at startup. Fails instead of substituting
    /// another backend.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match config {
            StoreConfig::Remote(remote) => Ok(Self::new(HttpBlobStore::new(
                &remote.url,
                &remote.namespace,
                remote.token.expose(),
                remote.timeout,
            )?)),
            StoreConfig::Memory => Ok(Self::memory()),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| StoreError::Json {
                key: String::from(key),
                source,
            })
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(value).map_err(|source| StoreError::Json {
            key: String::from(key),
            source,
        })?;
        self.backend.set(key, Bytes::from(encoded), ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(key).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    use super::{BlobBackend, KvStore, MemoryBlobStore, StoreError};
    use crate::config::StoreConfig;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn json_values_survive_a_store_round_trip() -> Result<()> {
        let store = KvStore::memory();
        let record = Record {
            name: String::from("alpha"),
            count: 3,
        };

        store.set_json("record", &record, None).await?;
        let loaded: Option<Record> = store.get_json("record").await?;

        assert_eq!(loaded, Some(record));
        Ok(())
    }

    #[tokio::test]
    async fn absent_key_is_none_not_error() -> Result<()> {
        let store = KvStore::memory();
        let loaded: Option<Record> = store.get_json("nothing-here").await?;
        assert!(loaded.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_value_is_a_json_error() -> Result<()> {
        let backend = MemoryBlobStore::default();
        backend.set("broken", Bytes::from_static(b"{not json"), None).await?;
        let store = KvStore::new(backend);

        let result: Result<Option<Record>, StoreError> = store.get_json("broken").await;
        assert!(matches!(result, Err(StoreError::Json { key, .. }) if key == "broken"));
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<()> {
        let store = KvStore::memory();
        store.set_json("k", &1_u32, None).await?;
        store.delete("k").await?;
        store.delete("k").await?;
        let loaded: Option<u32> = store.get_json("k").await?;
        assert!(loaded.is_none());
        Ok(())
    }

    #[test]
    fn memory_config_builds_memory_store() {
        assert!(KvStore::from_config(&StoreConfig::Memory).is_ok());
    }
}
