//! Content-type sniffing from payload bytes.
//!
//! The type of an image is decided by its leading bytes only, never by the
//! file extension or any declared metadata. Image signatures are matched by
//! `image::guess_format`; everything else is classified as text or as an
//! opaque binary blob.

use image::ImageFormat;
use std::fmt;

/// Number of leading bytes inspected when classifying non-image payloads.
const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Sniffed media type of a payload.
///
/// The three formats the pipeline can decode get their own variants; every
/// other payload carries its sniffed MIME string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Jpeg,
    Png,
    Gif,
    Other(String),
}

impl ContentType {
    /// Classify a payload by its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Self::Jpeg,
            Ok(ImageFormat::Png) => Self::Png,
            Ok(ImageFormat::Gif) => Self::Gif,
            Ok(other) => Self::Other(other.to_mime_type().to_string()),
            Err(_) if looks_like_text(bytes) => Self::Other(TEXT_PLAIN.to_string()),
            Err(_) => Self::Other(OCTET_STREAM.to_string()),
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Other(mime) => mime,
        }
    }

    /// Format a resized image of this type is written in.
    ///
    /// PNG and GIF keep their format; everything else becomes JPEG.
    pub fn encode_target(&self) -> Self {
        match self {
            Self::Png => Self::Png,
            Self::Gif => Self::Gif,
            _ => Self::Jpeg,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// UTF-8 without control characters other than common whitespace.
fn looks_like_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    let valid = match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence cut off by the sniff window is still text
        Err(e) => e.error_len().is_none() && head.len() == SNIFF_LEN,
    };
    valid
        && head
            .iter()
            .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
}
