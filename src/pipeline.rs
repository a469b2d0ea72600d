//! Transform-and-cache request pipeline.
//!
//! [`TransformPipeline::handle`] turns a `(preset, path)` request into bytes:
//!
//! ```text
//! preset lookup → cache key → store get ─ hit ─────────────────────────→ respond (+ETag)
//!                                   └─ miss → key lock → store get again ─ hit → respond (+ETag)
//!                                                           └─ miss → fetch → resize → save → respond
//! ```
//!
//! Failures never become server errors. An unknown preset or a failed fetch
//! is [`Outcome::NotFound`]. If the source cannot be decoded or the result
//! cannot be encoded, the original bytes are served and nothing is stored.
//! A failed save is logged and the freshly resized bytes are served anyway.
//!
//! The fetch/resize/save half of a miss runs on its own task. A client that
//! disconnects mid-transform does not cancel it, so the result is still
//! stored for the next request.
//!
//! The pipeline is built once at startup by [`TransformPipeline::build`] and
//! shared by every request.

use crate::cache_key::CacheKey;
use crate::coalesce::KeyedLocks;
use crate::config::{Config, ConfigError};
use crate::imaging::{ContentType, ImageBackend, Quality, RustBackend, resize_to_preset};
use crate::preset::{Preset, PresetError, PresetRegistry};
use crate::source::{self, FetchError, SourceClient};
use crate::store::{self, ResultStore, StoreError};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Presets(#[from] PresetError),
    #[error("Failed to set up source client: {0}")]
    Source(#[from] FetchError),
    #[error("Failed to set up result store: {0}")]
    Store(#[from] StoreError),
}

/// Which path through the pipeline produced a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read back from the result store.
    Cached,
    /// Resized during this request.
    Transformed,
    /// The unmodified source, served because it could not be transformed.
    Original,
}

/// Bytes to send plus the headers derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub body: Bytes,
    /// Sniffed from `body`, not from the source.
    pub content_type: String,
    /// Only set when the body came from the store.
    pub etag: Option<String>,
    pub origin: Origin,
}

impl ImageResponse {
    fn new(body: Bytes, etag: Option<String>, origin: Origin) -> Self {
        let content_type = ContentType::sniff(&body).mime().to_string();
        Self {
            body,
            content_type,
            etag,
            origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    Image(ImageResponse),
}

/// Request counters, updated lock-free by concurrent requests.
#[derive(Debug, Default)]
pub struct PipelineStats {
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
    not_found: AtomicU64,
}

impl PipelineStats {
    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hits: u64,
    /// Requests answered from a fetched source. Includes degraded ones.
    pub misses: u64,
    /// Misses answered with the original bytes.
    pub degraded: u64,
    pub not_found: u64,
}

impl StatsSnapshot {
    pub fn total(&self) -> u64 {
        self.hits + self.misses + self.not_found
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} transformed",
            self.hits,
            self.misses.saturating_sub(self.degraded)
        )?;
        if self.degraded > 0 {
            write!(f, ", {} served original", self.degraded)?;
        }
        if self.not_found > 0 {
            write!(f, ", {} not found", self.not_found)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

pub struct TransformPipeline {
    registry: PresetRegistry,
    source: Arc<dyn SourceClient>,
    store: Arc<dyn ResultStore>,
    backend: Arc<dyn ImageBackend>,
    locks: KeyedLocks,
    stats: Arc<PipelineStats>,
}

impl TransformPipeline {
    pub fn new(
        registry: PresetRegistry,
        source: Arc<dyn SourceClient>,
        store: Arc<dyn ResultStore>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            registry,
            source,
            store,
            backend,
            locks: KeyedLocks::new(),
            stats: Arc::default(),
        }
    }

    /// Resolve every collaborator from `config`.
    ///
    /// Loads the presets, connects the source (wrapped with fetch logging
    /// when `source.log` is set), opens the store and purges it when
    /// `store.purge_on_startup` is set. Any failure here is fatal.
    pub async fn build(config: &Config) -> Result<Self, StartupError> {
        let registry = PresetRegistry::load(&config.presets_file)?;
        info!(
            count = registry.len(),
            file = %config.presets_file.display(),
            "Loaded presets"
        );

        let mut source = source::connect(&config.source.backend()?)?;
        if config.source.log {
            source = source::with_logging(source);
        }

        let store = store::open(&config.store.backend()?).await?;
        if config.store.purge_on_startup {
            store.purge().await?;
            info!("Purged result store");
        }

        let backend = Arc::new(RustBackend::new(Quality::new(config.images.jpeg_quality)));
        Ok(Self::new(registry, source, store, backend))
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Serve `path` resized to the preset named `preset_name`.
    #[instrument(skip(self))]
    pub async fn handle(&self, preset_name: &str, path: &str) -> Outcome {
        let Some(preset) = self.registry.find(preset_name) else {
            debug!("Unknown preset");
            PipelineStats::record(&self.stats.not_found);
            return Outcome::NotFound;
        };
        debug!(%preset, "Found preset");

        let key = CacheKey::new(path, &preset.name);
        if let Some(hit) = self.cached(&key).await {
            return Outcome::Image(hit);
        }

        let guard = self.locks.lock(key.as_str()).await;
        // Another request may have filled the key while this one waited
        if let Some(hit) = self.cached(&key).await {
            return Outcome::Image(hit);
        }
        debug!(%key, "Cache miss");

        // The fill runs detached so a dropped request still stores its result
        let fill = Fill {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
            stats: Arc::clone(&self.stats),
        };
        let task = fill.run(key, path.to_string(), preset.clone());
        let handle = tokio::spawn(
            async move {
                let outcome = task.await;
                drop(guard);
                outcome
            }
            .in_current_span(),
        );

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Cache fill task failed");
                Outcome::NotFound
            }
        }
    }

    /// Store lookup. Read errors count as a miss.
    async fn cached(&self, key: &CacheKey) -> Option<ImageResponse> {
        match self.store.get(key.as_str()).await {
            Ok(Some(bytes)) => {
                debug!(%key, "Cache hit");
                PipelineStats::record(&self.stats.hits);
                Some(ImageResponse::new(bytes, Some(key.etag()), Origin::Cached))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "Store read failed, treating as miss");
                None
            }
        }
    }
}

/// Everything a cache miss needs, owned so it can outlive the request.
struct Fill {
    source: Arc<dyn SourceClient>,
    store: Arc<dyn ResultStore>,
    backend: Arc<dyn ImageBackend>,
    stats: Arc<PipelineStats>,
}

impl Fill {
    /// Fetch, resize and save. Falls back to the original bytes when the
    /// source cannot be transformed.
    async fn run(self, key: CacheKey, path: String, preset: Preset) -> Outcome {
        let original = match self.source.get_content(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to fetch source image");
                PipelineStats::record(&self.stats.not_found);
                return Outcome::NotFound;
            }
        };
        PipelineStats::record(&self.stats.misses);

        let backend = Arc::clone(&self.backend);
        let input = original.clone();
        let transformed =
            tokio::task::spawn_blocking(move || resize_to_preset(backend.as_ref(), &input, &preset))
                .await;

        let resized = match transformed {
            Ok(Ok(resized)) => resized,
            Ok(Err(e)) => {
                warn!(error = %e, decode = e.is_decode(), "Serving original image");
                PipelineStats::record(&self.stats.degraded);
                return Outcome::Image(ImageResponse::new(original, None, Origin::Original));
            }
            Err(e) => {
                error!(error = %e, "Resize task failed, serving original image");
                PipelineStats::record(&self.stats.degraded);
                return Outcome::Image(ImageResponse::new(original, None, Origin::Original));
            }
        };
        debug!(
            source_type = %resized.source_type,
            from = ?resized.source_size,
            to = ?resized.size,
            "Resized image"
        );

        let body = Bytes::from(resized.bytes);
        match self.store.save(key.as_str(), body.clone()).await {
            Ok(location) => info!(%key, %location, "Saved resized image"),
            Err(e) => error!(%key, error = %e, "Failed to save resized image"),
        }

        Outcome::Image(ImageResponse::new(body, None, Origin::Transformed))
    }
}
