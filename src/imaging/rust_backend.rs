//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Orientation | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Downscale | `DynamicImage::resize` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Raw camera files are never decoded here; the pipeline hands over their
//! extracted JPEG preview instead.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::fit_within;
use super::params::{Quality, ResizeParams, ThumbnailParams};
use crate::metadata::Rotation;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::BufWriter;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

fn upright(img: DynamicImage, rotation: Option<Rotation>) -> DynamicImage {
    match rotation {
        // image's rotateN turns clockwise
        Some(Rotation::Ccw90) => img.rotate270(),
        Some(Rotation::Ccw180) => img.rotate180(),
        Some(Rotation::Ccw270) => img.rotate90(),
        None => img,
    }
}

fn shrink(img: DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = fit_within((img.width(), img.height()), max_edge);
    if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let writer = BufWriter::new(std::fs::File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(writer, quality.value() as u8);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

/// Save in the format named by the output extension.
fn save_as(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => save_jpeg(img, path, quality),
        Ok(format) => img
            .save_with_format(path, format)
            .map_err(|e| BackendError::ProcessingFailed(format!("encode failed: {}", e))),
        Err(_) => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            path.display()
        ))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<Dimensions, BackendError> {
        let img = upright(load_image(&params.source)?, params.rotation);
        let thumb = shrink(img, params.max_edge);
        save_jpeg(&thumb, &params.output, params.quality)?;
        Ok(Dimensions {
            width: thumb.width(),
            height: thumb.height(),
        })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Option<Dimensions>, BackendError> {
        let img = load_image(&params.source)?;
        if img.width().max(img.height()) <= params.max_edge {
            return Ok(None);
        }
        let resized = shrink(img, params.max_edge);
        save_as(&resized, &params.output, params.quality)?;
        Ok(Some(Dimensions {
            width: resized.width(),
            height: resized.height(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, RgbImage};

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    fn thumb_params(source: &Path, output: &Path, rotation: Option<Rotation>) -> ThumbnailParams {
        ThumbnailParams {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            max_edge: 200,
            quality: Quality::new(80),
            rotation,
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn thumbnail_fits_longer_edge() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("thumb.jpg");
        create_test_jpeg(&source, 800, 600);

        let dims = RustBackend::new()
            .thumbnail(&thumb_params(&source, &output, None))
            .unwrap();

        assert_eq!(dims, Dimensions { width: 200, height: 150 });
        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 150));
    }

    #[test]
    fn thumbnail_rotates_before_resizing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("thumb.jpg");
        create_test_jpeg(&source, 800, 600);

        let dims = RustBackend::new()
            .thumbnail(&thumb_params(&source, &output, Some(Rotation::Ccw270)))
            .unwrap();

        assert_eq!(dims, Dimensions { width: 150, height: 200 });
    }

    #[test]
    fn thumbnail_of_small_image_keeps_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("small.jpg");
        let output = tmp.path().join("thumb.jpg");
        create_test_jpeg(&source, 120, 90);

        let dims = RustBackend::new()
            .thumbnail(&thumb_params(&source, &output, None))
            .unwrap();
        assert_eq!(dims, Dimensions { width: 120, height: 90 });
    }

    #[test]
    fn thumbnail_of_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();

        let result = RustBackend::new().thumbnail(&thumb_params(
            &source,
            &tmp.path().join("t.jpg"),
            None,
        ));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_writes_smaller_copy() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("big.jpg");
        let output = tmp.path().join("big.resizing.jpg");
        create_test_jpeg(&source, 640, 480);

        let dims = RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                max_edge: 320,
                quality: Quality::new(85),
            })
            .unwrap();

        assert_eq!(dims, Some(Dimensions { width: 320, height: 240 }));
        assert_eq!(image::image_dimensions(&output).unwrap(), (320, 240));
    }

    #[test]
    fn resize_skips_when_already_small() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("small.jpg");
        let output = tmp.path().join("small.resizing.jpg");
        create_test_jpeg(&source, 100, 80);

        let result = RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                max_edge: 320,
                quality: Quality::new(85),
            })
            .unwrap();

        assert_eq!(result, None);
        assert!(!output.exists());
    }
}
