//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the pipeline
//! needs: identify, thumbnail, and resize. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{ResizeParams, ThumbnailParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Get image dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Write an upright, downscaled JPEG; returns its dimensions.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<Dimensions, BackendError>;

    /// Shrink an image. Returns `None` without writing anything when the
    /// source already fits.
    fn resize(&self, params: &ResizeParams) -> Result<Option<Dimensions>, BackendError>;
}
