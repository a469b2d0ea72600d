//! Server configuration module.
//!
//! Loads, merges and validates the server's TOML config file. User values
//! are merged key-by-key over the stock defaults, so a config file only
//! needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! log_level = "info"             # tracing level; RUST_LOG overrides it
//! presets_file = "presets.json"  # JSON list of {name, width, height}
//!
//! [server]
//! address = "0.0.0.0"
//! port = 8080
//! graceful_timeout = 5           # seconds to drain requests on shutdown
//!
//! [images]
//! jpeg_quality = 75              # 1-100
//!
//! [source]
//! type = "local"                 # "local" or "http"
//! dir = "images"                 # local: root directory of originals
//! # base_url = "https://..."     # http: base URL of originals
//! timeout = 5                    # http: connect and request timeout, seconds
//! log = false                    # log every fetch
//!
//! [store]
//! type = "local"                 # "local" or "memory"
//! dir = "cache"                  # local: root directory of results
//! purge_on_startup = false
//! ```
//!
//! The `[source]` and `[store]` tables are flat on disk. After validation
//! they resolve into the closed [`SourceBackend`] and [`StoreBackend`]
//! variants that the factories in [`crate::source`] and [`crate::store`]
//! consume.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default tracing level, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Path to the JSON preset definitions.
    pub presets_file: PathBuf,
    pub server: ServerConfig,
    pub images: ImagesConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            presets_file: PathBuf::from("presets.json"),
            server: ServerConfig::default(),
            images: ImagesConfig::default(),
            source: SourceConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Validation(format!(
                "log_level {:?} is not a valid level",
                self.log_level
            )));
        }
        if self.presets_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "presets_file must not be empty".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        self.source.backend()?;
        self.store.backend()?;
        Ok(())
    }

    /// Default level filter for the tracing subscriber.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::INFO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests after a shutdown signal.
    pub graceful_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            graceful_timeout: 5,
        }
    }
}

impl ServerConfig {
    /// `address:port`, ready for a TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Quality for JPEG output (1-100).
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { jpeg_quality: 75 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Seconds, for both connecting and the whole request.
    pub timeout: u64,
    /// Wrap the client so every fetch is logged.
    pub log: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Local,
            dir: PathBuf::from("images"),
            base_url: None,
            timeout: 5,
            log: false,
        }
    }
}

/// Resolved source client selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceBackend {
    Local { dir: PathBuf },
    Http { base_url: String, timeout: Duration },
}

impl SourceConfig {
    /// Resolve the flat table into a backend variant, checking that the
    /// keys the chosen type needs are present.
    pub fn backend(&self) -> Result<SourceBackend, ConfigError> {
        match self.kind {
            SourceKind::Local => {
                if self.dir.as_os_str().is_empty() {
                    return Err(ConfigError::Validation(
                        "source.dir is required for a local source".into(),
                    ));
                }
                Ok(SourceBackend::Local {
                    dir: self.dir.clone(),
                })
            }
            SourceKind::Http => {
                let base_url = match self.base_url.as_deref() {
                    Some(url) if !url.trim().is_empty() => url.to_string(),
                    _ => {
                        return Err(ConfigError::Validation(
                            "source.base_url is required for an http source".into(),
                        ));
                    }
                };
                if self.timeout == 0 {
                    return Err(ConfigError::Validation(
                        "source.timeout must be non-zero".into(),
                    ));
                }
                Ok(SourceBackend::Http {
                    base_url,
                    timeout: Duration::from_secs(self.timeout),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Local,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub kind: StoreKind,
    pub dir: PathBuf,
    /// Remove everything in the store before serving.
    pub purge_on_startup: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Local,
            dir: PathBuf::from("cache"),
            purge_on_startup: false,
        }
    }
}

/// Resolved result store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Local { dir: PathBuf },
    Memory,
}

impl StoreConfig {
    pub fn backend(&self) -> Result<StoreBackend, ConfigError> {
        match self.kind {
            StoreKind::Local => {
                if self.dir.as_os_str().is_empty() {
                    return Err(ConfigError::Validation(
                        "store.dir is required for a local store".into(),
                    ));
                }
                Ok(StoreBackend::Local {
                    dir: self.dir.clone(),
                })
            }
            StoreKind::Memory => Ok(StoreBackend::Memory),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Unlike a missing optional layer, an explicitly named file that does not
/// exist is an error.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the server config.
///
/// With no path the stock defaults are used as-is. Otherwise the file's
/// values are merged over the defaults, unknown keys are rejected, and the
/// result is validated.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Resizer Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass the file with --config or the RESIZER_CONFIG_FILE environment variable.
# Unknown keys will cause an error.

# Default log level (error, warn, info, debug, trace).
# The RUST_LOG environment variable takes precedence when set.
log_level = "info"

# JSON file holding the list of presets, e.g.
#   [{"name": "thumb", "width": 100, "height": 0}]
# A zero width or height is derived from the source's aspect ratio.
presets_file = "presets.json"

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
address = "0.0.0.0"
port = 8080

# Seconds to wait for in-flight requests after SIGINT/SIGTERM.
graceful_timeout = 5

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[images]
# Quality used when the output is JPEG (1 = worst, 100 = best).
jpeg_quality = 75

# ---------------------------------------------------------------------------
# Where original images come from
# ---------------------------------------------------------------------------
[source]
# "local" reads files under `dir`; "http" fetches from `base_url`.
type = "local"
dir = "images"
# base_url = "https://images.example.com/originals"

# Connect and request timeout for the http source, in seconds.
timeout = 5

# Log every fetch, with its resolved location.
log = false

# ---------------------------------------------------------------------------
# Where transformed images are kept
# ---------------------------------------------------------------------------
[store]
# "local" writes files under `dir`; "memory" keeps results in-process.
# The memory store never evicts: it holds one entry per (path, preset)
# ever requested until the process exits.
type = "local"
dir = "cache"

# Remove all stored results before serving.
purge_on_startup = false
"##
}
