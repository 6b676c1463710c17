//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{Quality, ResizeParams, ThumbnailParams};
use crate::metadata::Rotation;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for thumbnail generation.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Longer edge of the thumbnail box in pixels.
    pub max_edge: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_edge: 150,
            quality: Quality::default(),
        }
    }
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(
    source: &Path,
    output_path: &Path,
    config: &ThumbnailConfig,
    rotation: Option<Rotation>,
) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output_path.to_path_buf(),
        max_edge: config.max_edge,
        quality: config.quality,
        rotation,
    }
}

/// Create a thumbnail image at `output_path`.
pub fn create_thumbnail(
    backend: &dyn ImageBackend,
    source: &Path,
    output_path: &Path,
    config: &ThumbnailConfig,
    rotation: Option<Rotation>,
) -> Result<Dimensions> {
    backend.thumbnail(&plan_thumbnail(source, output_path, config, rotation))
}

/// Scratch file used while an in-place resize is in flight.
fn scratch_path(path: &Path) -> PathBuf {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_extension(format!("resizing.{}", ext))
}

/// Shrink the file at `path` in place so its longer edge is at most
/// `max_edge`.
///
/// The smaller copy is written next to the original first. `preserve` then
/// gets `(original, copy)` to carry metadata across before the copy
/// replaces the original. Returns `None` when no resize was needed.
pub fn resize_in_place(
    backend: &dyn ImageBackend,
    path: &Path,
    max_edge: u32,
    quality: Quality,
    preserve: impl FnOnce(&Path, &Path),
) -> Result<Option<Dimensions>> {
    let scratch = scratch_path(path);
    let resized = backend.resize(&ResizeParams {
        source: path.to_path_buf(),
        output: scratch.clone(),
        max_edge,
        quality,
    });
    match resized {
        Ok(Some(dims)) => {
            preserve(path, &scratch);
            std::fs::rename(&scratch, path)?;
            Ok(Some(dims))
        }
        Ok(None) => Ok(None),
        Err(e) => {
            let _ = std::fs::remove_file(&scratch);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[test]
    fn plan_thumbnail_carries_rotation() {
        let config = ThumbnailConfig {
            max_edge: 240,
            quality: Quality::new(70),
        };
        let params = plan_thumbnail(
            Path::new("/a.jpg"),
            Path::new("/thumbs/a.jpg"),
            &config,
            Some(Rotation::Ccw90),
        );
        assert_eq!(params.max_edge, 240);
        assert_eq!(params.quality.value(), 70);
        assert_eq!(params.rotation, Some(Rotation::Ccw90));
    }

    #[test]
    fn create_thumbnail_uses_backend() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_size(4000, 2000);
        let output = tmp.path().join("a.jpg");

        let dims = create_thumbnail(
            &backend,
            Path::new("/photos/a.jpg"),
            &output,
            &ThumbnailConfig::default(),
            None,
        )
        .unwrap();

        assert_eq!(dims, Dimensions { width: 150, height: 75 });
        assert_eq!(backend.thumbnail_sources(), vec!["/photos/a.jpg"]);
    }

    #[test]
    fn scratch_keeps_extension() {
        assert_eq!(
            scratch_path(Path::new("/p/IMG_1.JPG")),
            PathBuf::from("/p/IMG_1.resizing.JPG")
        );
    }

    #[test]
    fn resize_in_place_replaces_original() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.jpg");
        std::fs::write(&path, b"original").unwrap();
        let backend = MockBackend::with_size(4000, 3000);
        let preserved = RefCell::new(Vec::new());

        let dims = resize_in_place(&backend, &path, 1000, Quality::default(), |from, to| {
            preserved
                .borrow_mut()
                .push((from.to_path_buf(), to.to_path_buf()));
        })
        .unwrap();

        assert_eq!(dims, Some(Dimensions { width: 1000, height: 750 }));
        assert!(path.exists());
        assert!(!scratch_path(&path).exists());
        assert_eq!(preserved.borrow()[0], (path.clone(), scratch_path(&path)));
    }

    #[test]
    fn resize_in_place_noop_when_small() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("small.jpg");
        std::fs::write(&path, b"original").unwrap();
        let backend = MockBackend::with_size(640, 480);

        let dims = resize_in_place(&backend, &path, 1000, Quality::default(), |_, _| {
            panic!("nothing to preserve")
        })
        .unwrap();

        assert_eq!(dims, None);
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Resize { max_edge: 1000, .. }
        ));
    }
}
