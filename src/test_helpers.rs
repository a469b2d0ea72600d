//! Shared test utilities for the image-resizer test suite.
//!
//! Provides synthetic image builders and instrumented stand-ins for the
//! pipeline's collaborators, so tests can count calls and force failures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = CountingSource::new().with_file("cats/a.jpg", jpeg_bytes(400, 300));
//! let backend = CountingBackend::new();
//! // ... run the pipeline ...
//! assert_eq!(source.calls(), 1);
//! assert_eq!(backend.decodes(), 1);
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Frame, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::imaging::{BackendError, ContentType, Dimensions, ImageBackend, RustBackend};
use crate::source::{FetchError, SourceClient};
use crate::store::{MemoryStore, ResultStore, StoreError};

// =========================================================================
// Image builders
// =========================================================================

fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// A `width`×`height` JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&gradient_rgb(width, height))
        .unwrap();
    buf
}

/// A `width`×`height` RGBA PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// A single-frame `width`×`height` GIF.
pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.encode_frame(Frame::new(img)).unwrap();
    }
    buf
}

/// Decode any supported image and return its (width, height).
pub fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

// =========================================================================
// Source stand-in
// =========================================================================

/// In-memory source that counts fetches.
#[derive(Default)]
pub struct CountingSource {
    files: HashMap<String, Bytes>,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Bytes>) -> Self {
        self.files.insert(path.to_string(), content.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for CountingSource {
    async fn get_content(&self, path: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }

    fn normalized_path(&self, path: &str) -> String {
        format!("mem://{path}")
    }
}

// =========================================================================
// Backend stand-ins
// =========================================================================

/// [`RustBackend`] wrapper that counts decode and encode calls.
#[derive(Default)]
pub struct CountingBackend {
    inner: RustBackend,
    decodes: AtomicUsize,
    encodes: AtomicUsize,
    decode_delay: Duration,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block each decode for `delay`, to keep a transform in flight.
    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = delay;
        self
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl ImageBackend for CountingBackend {
    fn decode(
        &self,
        bytes: &[u8],
        content_type: &ContentType,
    ) -> Result<DynamicImage, BackendError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if !self.decode_delay.is_zero() {
            std::thread::sleep(self.decode_delay);
        }
        self.inner.decode(bytes, content_type)
    }

    fn resize(&self, image: &DynamicImage, target: Dimensions) -> DynamicImage {
        self.inner.resize(image, target)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        content_type: &ContentType,
    ) -> Result<Vec<u8>, BackendError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(image, content_type)
    }
}

/// Decodes and resizes normally, but every encode fails.
#[derive(Default)]
pub struct FailingEncodeBackend {
    inner: RustBackend,
}

impl ImageBackend for FailingEncodeBackend {
    fn decode(
        &self,
        bytes: &[u8],
        content_type: &ContentType,
    ) -> Result<DynamicImage, BackendError> {
        self.inner.decode(bytes, content_type)
    }

    fn resize(&self, image: &DynamicImage, target: Dimensions) -> DynamicImage {
        self.inner.resize(image, target)
    }

    fn encode(
        &self,
        _image: &DynamicImage,
        content_type: &ContentType,
    ) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::Encode {
            content_type: content_type.to_string(),
            source: image::ImageError::IoError(std::io::Error::other("encoder unavailable")),
        })
    }
}

// =========================================================================
// Store stand-in
// =========================================================================

/// [`MemoryStore`] wrapper that counts reads and writes, and can be told to
/// reject every save.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    fail_saves: bool,
    gets: AtomicUsize,
    saves: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail, like a read-only disk.
    pub fn read_only() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn save(&self, key: &str, content: Bytes) -> Result<String, StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(StoreError::Io {
                path: key.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only store",
                ),
            });
        }
        self.inner.save(key, content).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn purge(&self) -> Result<(), StoreError> {
        self.inner.purge().await
    }
}
