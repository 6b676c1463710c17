//! Shared test utilities: synthetic JPEG fixtures with embedded EXIF.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_jpeg_with_exif(
//!     &tmp.path().join("a.jpg"),
//!     64,
//!     48,
//!     &[ascii_field(Tag::DateTimeOriginal, "2020:03:01 12:00:00")],
//! );
//! ```

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::{ImageEncoder, RgbImage};
use std::io::Cursor;
use std::path::Path;

const SOI_LEN: usize = 2;
const APP1_MARKER: [u8; 2] = [0xFF, 0xE1];
const EXIF_HEADER: &[u8] = b"Exif\0\0";

// =========================================================================
// Fields
// =========================================================================

pub fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

pub fn short_field(tag: Tag, value: u16) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![value]),
    }
}

// =========================================================================
// Files
// =========================================================================

/// Encode a gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// APP1 segment carrying a TIFF-encoded EXIF block.
pub fn exif_segment(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let length = (2 + EXIF_HEADER.len() + tiff.len()) as u16;
    let mut segment = APP1_MARKER.to_vec();
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(&tiff);
    segment
}

/// Write a JPEG with `fields` embedded right after the SOI marker.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, fields: &[Field]) {
    let jpeg = jpeg_bytes(width, height);
    let mut out = jpeg[..SOI_LEN].to_vec();
    out.extend(exif_segment(fields));
    out.extend_from_slice(&jpeg[SOI_LEN..]);
    std::fs::write(path, out).unwrap();
}

#[test]
fn embedded_exif_reads_back() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("a.jpg");
    write_jpeg_with_exif(
        &path,
        16,
        8,
        &[
            ascii_field(Tag::DateTimeOriginal, "2020:03:01 12:00:00"),
            short_field(Tag::Orientation, 6),
        ],
    );

    let meta = crate::metadata::extract(&path);
    assert_eq!(meta.taken.to_string(), "2020-03-01 12:00:00");
    assert_eq!(meta.rotation, Some(crate::metadata::Rotation::Ccw270));
    assert_eq!(image::image_dimensions(&path).unwrap(), (16, 8));
}
