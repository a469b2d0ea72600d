//! In-process result store.
//!
//! Nothing is ever evicted. The map grows by one entry per distinct cache
//! key until the process exits or the store is purged, so this backend
//! suits tests and small, fixed image sets.

use super::{ResultStore, StoreError, check_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Keeps transformed images in a map. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        check_key(key)?;
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, content: Bytes) -> Result<String, StoreError> {
        check_key(key)?;
        self.items.lock().await.insert(key.to_string(), content);
        Ok(format!("memory://{key}"))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.items.lock().await.remove(key);
        Ok(())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        self.items.lock().await.clear();
        Ok(())
    }
}
