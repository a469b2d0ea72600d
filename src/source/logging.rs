//! Logging wrapper for any source client.

use super::{FetchError, SourceClient};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, info};

/// Logs every fetch made through the wrapped client.
pub struct LoggingSource {
    inner: Arc<dyn SourceClient>,
}

/// Wrap `client` so each fetch is logged before and after it runs.
pub fn with_logging(client: Arc<dyn SourceClient>) -> Arc<dyn SourceClient> {
    Arc::new(LoggingSource { inner: client })
}

#[async_trait]
impl SourceClient for LoggingSource {
    async fn get_content(&self, path: &str) -> Result<Bytes, FetchError> {
        let location = self.inner.normalized_path(path);
        info!(path, %location, "Retrieving source image");

        let result = self.inner.get_content(path).await;
        match &result {
            Ok(bytes) => info!(path, size = bytes.len(), "Retrieved source image"),
            Err(e) => error!(path, error = %e, "Source client error"),
        }
        result
    }

    fn normalized_path(&self, path: &str) -> String {
        self.inner.normalized_path(path)
    }
}
