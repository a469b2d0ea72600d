//! Cache key derivation.
//!
//! A key identifies one (source path, preset) transformation result in the
//! result store. It is path-shaped so filesystem stores lay results out as a
//! directory tree:
//!
//! ```text
//! {fnv1a32(source_path)}/{preset_name}/{base_name(source_path)}
//! ```
//!
//! The hash is FNV-1a over the raw bytes of the source path, printed in
//! decimal. It is not cryptographic; it only needs to be stable across
//! process restarts, which FNV is (no seed, no platform dependence).
//!
//! The same key doubles as the client cache validator: the ETag sent on a
//! cache hit is the FNV-1a hash of the key itself.

use std::fmt;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Last element of a slash-separated path.
///
/// Trailing slashes are ignored. An empty path yields `"."` and a path made
/// only of slashes yields `"/"`.
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Storage key for a transformed image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `source_path` resized with `preset_name`.
    pub fn new(source_path: &str, preset_name: &str) -> Self {
        let hash = fnv1a_32(source_path.as_bytes());
        Self(format!("{hash}/{preset_name}/{}", base_name(source_path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted entity tag for responses served from the store.
    pub fn etag(&self) -> String {
        format!("\"{}\"", fnv1a_32(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
