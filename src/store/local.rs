//! Local filesystem result store.
//!
//! Each key maps to a file under the root directory; the slashes in a key
//! become subdirectories, created on demand by [`save`](LocalStore::save).
//!
//! Writes go to a uniquely named temp file in the destination directory,
//! are synced, then renamed over the final path. A crash mid-save leaves at
//! worst a stray temp file, never a truncated entry under the real key.

use super::{ResultStore, StoreError, check_key};
use crate::paths::join_under;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

pub struct LocalStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| io_error(&root, e))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        match join_under(&self.root, key) {
            Some(path) if path != self.root => Ok(path),
            _ => Err(StoreError::InvalidKey(key.to_string())),
        }
    }

    async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{file_name}.tmp.{}", Uuid::new_v4()));

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(content).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp file");
            }
            return Err(io_error(path, e));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let path = self.path_for(key)?;
        let _guard = self.lock.lock().await;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn save(&self, key: &str, content: Bytes) -> Result<String, StoreError> {
        let path = self.path_for(key)?;
        let _guard = self.lock.lock().await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        Self::write_atomic(&path, &content).await?;

        Ok(path.display().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let _guard = self.lock.lock().await;

        fs::remove_file(&path).await.map_err(|e| io_error(&path, e))
    }

    async fn purge(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&self.root, e)),
        }
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
