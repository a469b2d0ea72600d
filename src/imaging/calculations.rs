//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Calculate the output size for a preset applied to a source image.
///
/// - Both requested dimensions non-zero: the exact requested size (the
///   aspect ratio of the source is not preserved).
/// - One dimension zero: that axis is derived from the other so the source
///   aspect ratio is kept, rounded to the nearest pixel and never below 1.
/// - Both zero: the source size, unchanged.
///
/// # Examples
/// ```
/// # use image_resizer::imaging::{Dimensions, calculate_target_dimensions};
/// let source = Dimensions { width: 400, height: 300 };
/// let target = calculate_target_dimensions(source, 100, 0);
/// assert_eq!(target, Dimensions { width: 100, height: 75 });
/// ```
pub fn calculate_target_dimensions(source: Dimensions, width: u32, height: u32) -> Dimensions {
    match (width, height) {
        (0, 0) => source,
        (0, h) => Dimensions {
            width: scale_axis(source.width, h, source.height),
            height: h,
        },
        (w, 0) => Dimensions {
            width: w,
            height: scale_axis(source.height, w, source.width),
        },
        (w, h) => Dimensions {
            width: w,
            height: h,
        },
    }
}

/// `value * numerator / denominator`, rounded, clamped to at least 1.
fn scale_axis(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value.max(1);
    }
    let scaled = (value as f64 * numerator as f64 / denominator as f64).round();
    (scaled as u32).max(1)
}
