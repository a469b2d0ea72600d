//! Result stores: where transformed images are kept.
//!
//! A [`ResultStore`] is a keyed blob store for transformed images. Keys come
//! from [`CacheKey`](crate::cache_key::CacheKey) and are path-shaped. The
//! store returns whatever was last saved under a key; it does not inspect
//! the bytes.
//!
//! | Backend | Type |
//! |---|---|
//! | `local` | [`LocalStore`]: one file per key under a root directory |
//! | `memory` | [`MemoryStore`]: process-local map, lost on restart |
//!
//! Every operation on one store instance runs under a single store-wide
//! lock, so calls serialize even for unrelated keys.

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::config::StoreBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store key is empty")]
    EmptyKey,
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Keyed byte store for transformed images.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Bytes saved under `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Save `content` under `key`, replacing any previous value. Returns a
    /// human-readable location of the stored item.
    async fn save(&self, key: &str, content: Bytes) -> Result<String, StoreError>;

    /// Remove the item under `key`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove everything in the store.
    async fn purge(&self) -> Result<(), StoreError>;
}

/// Open the result store described by `backend`.
pub async fn open(backend: &StoreBackend) -> Result<Arc<dyn ResultStore>, StoreError> {
    let store: Arc<dyn ResultStore> = match backend {
        StoreBackend::Local { dir } => Arc::new(LocalStore::new(dir).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(())
}
