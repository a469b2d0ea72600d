//! Local filesystem source client.

use super::{FetchError, SourceClient};
use crate::paths::join_under;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Serves originals from files under a root directory.
#[derive(Debug)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// Create a client rooted at `root`, which must already exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FetchError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(FetchError::Config(format!(
                "source directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        join_under(&self.root, path).ok_or_else(|| FetchError::InvalidPath(path.to_string()))
    }
}

#[async_trait]
impl SourceClient for LocalSource {
    async fn get_content(&self, path: &str) -> Result<Bytes, FetchError> {
        let full_path = self.resolve(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FetchError::NotFound(full_path.display().to_string()))
            }
            Err(source) => Err(FetchError::Io {
                path: full_path.display().to_string(),
                source,
            }),
        }
    }

    fn normalized_path(&self, path: &str) -> String {
        match join_under(&self.root, path) {
            Some(full_path) => full_path.display().to_string(),
            None => path.to_string(),
        }
    }
}
