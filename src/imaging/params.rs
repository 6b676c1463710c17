//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how*. They are the interface
//! between [`operations`](super::operations), which decides what to create,
//! and the [`backend`](super::backend), which does the pixel work.

use crate::metadata::Rotation;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Downscale `source` into a JPEG at `output` whose longer edge is at most
/// `max_edge`, after turning it upright.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub max_edge: u32,
    pub quality: Quality,
    /// Applied to the decoded pixels before resizing.
    pub rotation: Option<Rotation>,
}

/// Shrink `source` so its longer edge is at most `max_edge`, writing the
/// result in the same format to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub max_edge: u32,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }
}
