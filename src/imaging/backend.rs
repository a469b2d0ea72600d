//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three codec operations the
//! transform pipeline needs: decode, resize, and encode. Content-type
//! sniffing is a pure function of the bytes and lives in
//! [`ContentType::sniff`](super::ContentType::sniff).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests wrap it to count
//! calls or to inject failures.

use super::content_type::ContentType;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No decoder for content type {0}")]
    UnsupportedType(String),
    #[error("Failed to decode {content_type}: {source}")]
    Decode {
        content_type: String,
        source: image::ImageError,
    },
    #[error("Failed to encode {content_type}: {source}")]
    Encode {
        content_type: String,
        source: image::ImageError,
    },
}

impl BackendError {
    /// Whether the failure happened before any pixels were available.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::Decode { .. })
    }
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Trait for image codec backends.
///
/// Implementations must be deterministic: the same input and target always
/// yield the same output bytes, so concurrent writers of one cache key store
/// identical content.
pub trait ImageBackend: Send + Sync {
    /// Decode `bytes` with the decoder selected by `content_type`.
    fn decode(&self, bytes: &[u8], content_type: &ContentType)
    -> Result<DynamicImage, BackendError>;

    /// Scale `image` to exactly `target`.
    fn resize(&self, image: &DynamicImage, target: Dimensions) -> DynamicImage;

    /// Encode `image` in the output format for `content_type`
    /// (see [`ContentType::encode_target`]).
    fn encode(&self, image: &DynamicImage, content_type: &ContentType)
    -> Result<Vec<u8>, BackendError>;
}
