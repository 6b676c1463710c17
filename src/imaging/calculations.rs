//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::metadata::Rotation;

/// Scale `source` so its longer edge is at most `max_edge`, keeping the
/// aspect ratio. Never upscales; neither side drops below one pixel.
///
/// ```
/// # use exif_gal::imaging::fit_within;
/// assert_eq!(fit_within((4000, 3000), 200), (200, 150));
/// assert_eq!(fit_within((100, 80), 200), (100, 80));
/// ```
pub fn fit_within(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer = w.max(h);
    if longer <= max_edge || longer == 0 {
        return (w, h);
    }
    let ratio = max_edge as f64 / longer as f64;
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    if w >= h {
        (max_edge, scale(h))
    } else {
        (scale(w), max_edge)
    }
}

/// Dimensions after turning an image by `rotation`.
pub fn rotated_dimensions(dims: (u32, u32), rotation: Option<Rotation>) -> (u32, u32) {
    match rotation {
        Some(Rotation::Ccw90 | Rotation::Ccw270) => (dims.1, dims.0),
        Some(Rotation::Ccw180) | None => dims,
    }
}
