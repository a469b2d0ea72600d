//! Source clients: where original images come from.
//!
//! A [`SourceClient`] fetches the raw bytes of an original image by its
//! logical path (the part of the request URL after the preset name). Clients
//! never cache; caching is the result store's job.
//!
//! | Backend | Type |
//! |---|---|
//! | `local` | [`LocalSource`]: files under a root directory |
//! | `http` | [`HttpSource`]: GET against a base URL |
//!
//! Backends are chosen once at startup by [`connect`]. Any client can be
//! wrapped with [`with_logging`] to trace each fetch.

mod http;
mod local;
mod logging;

pub use http::HttpSource;
pub use local::LocalSource;
pub use logging::{LoggingSource, with_logging};

use crate::config::SourceBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Source image not found: {0}")]
    NotFound(String),
    #[error("Invalid source path: {0}")]
    InvalidPath(String),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("Source client configuration error: {0}")]
    Config(String),
}

/// Fetches original image bytes by logical path.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Return the full content at `path`, or an error if it is missing or
    /// unreadable.
    async fn get_content(&self, path: &str) -> Result<Bytes, FetchError>;

    /// Canonical form of `path` for logs (a filesystem path or full URL).
    fn normalized_path(&self, path: &str) -> String;
}

/// Build the source client described by `backend`.
pub fn connect(backend: &SourceBackend) -> Result<Arc<dyn SourceClient>, FetchError> {
    let client: Arc<dyn SourceClient> = match backend {
        SourceBackend::Local { dir } => Arc::new(LocalSource::new(dir)?),
        SourceBackend::Http { base_url, timeout } => Arc::new(HttpSource::new(base_url, *timeout)?),
    };
    Ok(client)
}
