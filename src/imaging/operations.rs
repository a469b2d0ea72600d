//! High-level image operations combining calculations + backend.
//!
//! [`resize_to_preset`] is the codec half of the transform pipeline:
//!
//! ```text
//! sniff → decode → target size → resize → encode
//! ```
//!
//! Any error is returned to the caller, which decides the fallback. The
//! function is synchronous and CPU-bound; async callers should run it on a
//! blocking thread.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_target_dimensions;
use super::content_type::ContentType;
use crate::preset::Preset;

/// Result of a successful resize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resized {
    pub bytes: Vec<u8>,
    /// Type sniffed from the source payload.
    pub source_type: ContentType,
    pub source_size: Dimensions,
    pub size: Dimensions,
}

/// Decode `source`, scale it to `preset`, and re-encode it.
pub fn resize_to_preset(
    backend: &dyn ImageBackend,
    source: &[u8],
    preset: &Preset,
) -> Result<Resized, BackendError> {
    let source_type = ContentType::sniff(source);
    let image = backend.decode(source, &source_type)?;

    let source_size = Dimensions::of(&image);
    let size = calculate_target_dimensions(source_size, preset.width, preset.height);
    let resized = backend.resize(&image, size);

    let bytes = backend.encode(&resized, &source_type)?;
    Ok(Resized {
        bytes,
        source_type,
        source_size,
        size,
    })
}
