//! Pure Rust image codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image::load_from_memory_with_format` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (single frame) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//!
//! Animated GIFs are decoded to their first frame only.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::content_type::ContentType;
use super::params::Quality;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame, ImageFormat};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    jpeg_quality: Quality,
}

impl RustBackend {
    pub fn new(jpeg_quality: Quality) -> Self {
        Self { jpeg_quality }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

impl ImageBackend for RustBackend {
    fn decode(
        &self,
        bytes: &[u8],
        content_type: &ContentType,
    ) -> Result<DynamicImage, BackendError> {
        let format = match content_type {
            ContentType::Jpeg => ImageFormat::Jpeg,
            ContentType::Png => ImageFormat::Png,
            ContentType::Gif => ImageFormat::Gif,
            ContentType::Other(mime) => return Err(BackendError::UnsupportedType(mime.clone())),
        };
        image::load_from_memory_with_format(bytes, format).map_err(|source| BackendError::Decode {
            content_type: content_type.to_string(),
            source,
        })
    }

    fn resize(&self, image: &DynamicImage, target: Dimensions) -> DynamicImage {
        image.resize_exact(target.width, target.height, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        content_type: &ContentType,
    ) -> Result<Vec<u8>, BackendError> {
        let target = content_type.encode_target();
        let mut buf = Vec::new();

        let result = match target {
            ContentType::Png => image.write_with_encoder(PngEncoder::new(&mut buf)),
            ContentType::Gif => {
                let mut encoder = GifEncoder::new(&mut buf);
                encoder.encode_frame(Frame::new(image.to_rgba8()))
            }
            _ => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut buf,
                    self.jpeg_quality.value(),
                ))
            }
        };

        result.map_err(|source| BackendError::Encode {
            content_type: target.to_string(),
            source,
        })?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gif_bytes, jpeg_bytes, png_bytes};

    fn backend() -> RustBackend {
        RustBackend::default()
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let img = backend()
            .decode(&jpeg_bytes(200, 150), &ContentType::Jpeg)
            .unwrap();
        assert_eq!(Dimensions::of(&img), Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn decode_synthetic_png() {
        let img = backend().decode(&png_bytes(64, 32), &ContentType::Png).unwrap();
        assert_eq!(Dimensions::of(&img), Dimensions { width: 64, height: 32 });
    }

    #[test]
    fn decode_synthetic_gif() {
        let img = backend().decode(&gif_bytes(20, 10), &ContentType::Gif).unwrap();
        assert_eq!(Dimensions::of(&img), Dimensions { width: 20, height: 10 });
    }

    #[test]
    fn decode_unsupported_type_errors() {
        let result = backend().decode(b"hello", &ContentType::Other("text/plain".into()));
        assert!(matches!(result, Err(BackendError::UnsupportedType(_))));
        assert!(result.unwrap_err().is_decode());
    }

    #[test]
    fn decode_truncated_payload_errors() {
        let mut bytes = png_bytes(64, 64);
        bytes.truncate(40);
        let result = backend().decode(&bytes, &ContentType::Png);
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn decode_with_wrong_declared_type_errors() {
        let result = backend().decode(&png_bytes(8, 8), &ContentType::Jpeg);
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn resize_to_exact_dimensions() {
        let b = backend();
        let img = b.decode(&jpeg_bytes(400, 300), &ContentType::Jpeg).unwrap();
        let resized = b.resize(&img, Dimensions { width: 50, height: 80 });
        assert_eq!(Dimensions::of(&resized), Dimensions { width: 50, height: 80 });
    }

    #[test]
    fn resize_is_deterministic() {
        let b = backend();
        let img = b.decode(&png_bytes(120, 90), &ContentType::Png).unwrap();
        let target = Dimensions { width: 40, height: 30 };
        let first = b.encode(&b.resize(&img, target), &ContentType::Png).unwrap();
        let second = b.encode(&b.resize(&img, target), &ContentType::Png).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn encode_png_stays_png() {
        let b = backend();
        let img = b.decode(&png_bytes(16, 16), &ContentType::Png).unwrap();
        let out = b.encode(&img, &ContentType::Png).unwrap();
        assert_eq!(ContentType::sniff(&out), ContentType::Png);
    }

    #[test]
    fn encode_gif_stays_gif() {
        let b = backend();
        let img = b.decode(&gif_bytes(16, 16), &ContentType::Gif).unwrap();
        let out = b.encode(&img, &ContentType::Gif).unwrap();
        assert_eq!(ContentType::sniff(&out), ContentType::Gif);
    }

    #[test]
    fn encode_jpeg_stays_jpeg() {
        let b = backend();
        let img = b.decode(&jpeg_bytes(16, 16), &ContentType::Jpeg).unwrap();
        let out = b.encode(&img, &ContentType::Jpeg).unwrap();
        assert_eq!(ContentType::sniff(&out), ContentType::Jpeg);
    }

    #[test]
    fn encode_other_type_falls_back_to_jpeg() {
        let b = backend();
        // RGBA source exercises the alpha drop before JPEG encoding
        let img = b.decode(&png_bytes(16, 16), &ContentType::Png).unwrap();
        let out = b
            .encode(&img, &ContentType::Other("image/webp".into()))
            .unwrap();
        assert_eq!(ContentType::sniff(&out), ContentType::Jpeg);
    }

    #[test]
    fn jpeg_quality_affects_output_size() {
        let img = backend()
            .decode(&jpeg_bytes(128, 128), &ContentType::Jpeg)
            .unwrap();
        let low = RustBackend::new(Quality::new(10))
            .encode(&img, &ContentType::Jpeg)
            .unwrap();
        let high = RustBackend::new(Quality::new(100))
            .encode(&img, &ContentType::Jpeg)
            .unwrap();
        assert!(low.len() < high.len());
    }
}
