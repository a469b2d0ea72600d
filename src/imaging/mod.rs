//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` + text/binary heuristic |
//! | **Decode** | `image` PNG, GIF and JPEG decoders |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` |
//! | **Encode** | PNG → PNG, GIF → GIF, anything else → JPEG |
//!
//! The module is split into:
//! - **Content type**: [`ContentType`] sniffing from leading bytes
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Encoding settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`resize_to_preset`], combining calculations + backend

pub mod backend;
mod calculations;
pub mod content_type;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_target_dimensions;
pub use content_type::ContentType;
pub use operations::{Resized, resize_to_preset};
pub use params::Quality;
pub use rust_backend::RustBackend;
