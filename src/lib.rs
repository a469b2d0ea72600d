//! # Image Resizer
//!
//! An HTTP server that resizes images on demand. A request names a size
//! preset and a source path; the first request for a pair computes the
//! resized image and stores it, later ones are served from the store.
//!
//! # Architecture: Transform-and-Cache Pipeline
//!
//! ```text
//! GET /{preset}/{path}
//!   → preset lookup          (PresetRegistry, loaded once at startup)
//!   → cache key              ("{fnv(path)}/{preset}/{basename(path)}")
//!   → result store get       ─ hit → respond with ETag
//!   → source fetch           (local directory or HTTP origin)
//!   → decode → resize → encode
//!   → result store save
//!   → respond
//! ```
//!
//! Every collaborator sits behind a trait so the pipeline never knows which
//! backend it is talking to:
//!
//! - [`source::SourceClient`]: where originals come from
//! - [`store::ResultStore`]: where resized results are kept
//! - [`imaging::ImageBackend`]: how bytes become pixels and back
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML server config: stock defaults, overlay merge, validation |
//! | [`preset`] | Named target sizes loaded from a JSON file |
//! | [`cache_key`] | Deterministic store keys and ETags |
//! | [`source`] | Source clients: local filesystem, HTTP, logging wrapper |
//! | [`store`] | Result stores: local filesystem, in-memory |
//! | [`imaging`] | Content sniffing, decode, Lanczos3 resize, encode |
//! | [`coalesce`] | Per-key locks that collapse concurrent misses |
//! | [`pipeline`] | The request pipeline and its fallback policy |
//! | [`server`] | axum routes, response headers, graceful shutdown |
//!
//! # Design Decisions
//!
//! ## Degrade, Don't Fail
//!
//! Resizing is an optimization. When a source cannot be decoded or the
//! result cannot be encoded, the original bytes are served instead. When
//! the store cannot be written, the resized bytes are still served. The
//! client sees a resized image, the original image, or a 404, never a 5xx
//! from the pipeline itself.
//!
//! ## Content Type From Bytes
//!
//! The format of a payload is decided by sniffing its leading bytes, not by
//! its extension. PNG stays PNG and GIF stays GIF; everything else the
//! pipeline can decode is written as JPEG. The `Content-Type` header is
//! sniffed again from whatever is actually sent.
//!
//! ## One Computation Per Key
//!
//! Concurrent misses for the same key queue on a per-key lock and re-check
//! the store once they hold it, so a burst of identical requests fetches and
//! resizes the source once. Unrelated keys never wait on each other in the
//! pipeline; the local store still serializes its own file operations.
//!
//! ## Atomic Writes
//!
//! The local store writes each result to a temp file, syncs it, and renames
//! it into place. The store never checks what it serves, so a torn write
//! would otherwise be served forever.

pub mod cache_key;
pub mod coalesce;
pub mod config;
pub mod imaging;
mod paths;
pub mod pipeline;
pub mod preset;
pub mod server;
pub mod source;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
