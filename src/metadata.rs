//! Embedded image metadata extraction.
//!
//! Reads EXIF tags through `kamadak-exif` and normalizes them into an
//! [`ImageMetadata`]. Extraction never fails: every absent or malformed tag
//! degrades to `None` instead of aborting the record.
//!
//! ## Capture time
//!
//! The capture timestamp is resolved by walking an ordered chain of sources,
//! the first one that parses wins:
//!
//! ```text
//! 1. DateTimeOriginal   (Exif IFD)
//! 2. DateTimeOriginal   (IFD0, written there by some encoders)
//! 3. DateTime           (last modification, IFD0)
//! 4. filesystem mtime
//! ```
//!
//! All three tags use the `YYYY:MM:DD HH:MM:SS` layout.
//!
//! ## GPS
//!
//! Latitude and longitude each need their value tag (at least three
//! rationals: degrees, minutes, seconds) and their hemisphere tag. Positions
//! within 0.01° of (0, 0) are treated as unset; many cameras write zeros
//! when they have no fix.
//!
//! ## Captions
//!
//! - **Sidecar**: `<stem>.txt` next to the image, trimmed.
//! - **Embedded**: EXIF `ImageDescription`.
//!
//! The sidecar wins; see [`resolve`].

use crate::types::GpsCoordinate;
use chrono::{DateTime, Local, NaiveDateTime};
use exif::{Context, Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Both coordinates below this many degrees means "no fix".
const NULL_GPS_EPSILON: f64 = 0.01;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Raw camera formats browsers cannot display. Matched case-insensitively.
const RAW_EXTENSIONS: &[&str] = &[
    "3fr", "arw", "cr2", "cr3", "crw", "dcr", "dng", "erf", "iiq", "kdc", "mef", "mos", "mrw",
    "nef", "nrw", "orf", "pef", "raf", "raw", "rw2", "rwl", "sr2", "srf", "srw", "x3f",
];

/// Why a single metadata source produced nothing. Never leaves this module's
/// callers: it only drives the fallback chain.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("tag {0} not present")]
    MissingTag(Tag),
    #[error("unparseable timestamp {0:?}")]
    BadTimestamp(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can answer "what is the value of this tag".
///
/// Implemented for a parsed [`Exif`] container; tests substitute a plain list.
pub trait TagSource {
    fn value(&self, tag: Tag) -> Option<&Value>;
}

impl TagSource for Exif {
    fn value(&self, tag: Tag) -> Option<&Value> {
        self.get_field(tag, In::PRIMARY).map(|f| &f.value)
    }
}

/// First ASCII entry of a tag, trimmed. Empty strings count as absent.
pub fn ascii(tags: &dyn TagSource, tag: Tag) -> Option<String> {
    match tags.value(tag)? {
        Value::Ascii(entries) => entries
            .first()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// All rational components of a tag as finite floats.
pub fn rationals(tags: &dyn TagSource, tag: Tag) -> Option<Vec<f64>> {
    let values: Vec<f64> = match tags.value(tag)? {
        Value::Rational(v) => v.iter().map(|r| r.to_f64()).collect(),
        Value::SRational(v) => v.iter().map(|r| r.to_f64()).collect(),
        _ => return None,
    };
    if values.iter().all(|v| v.is_finite()) {
        Some(values)
    } else {
        None
    }
}

fn rational(tags: &dyn TagSource, tag: Tag) -> Option<f64> {
    rationals(tags, tag)?.first().copied()
}

/// First unsigned integer of a tag (BYTE, SHORT or LONG).
pub fn uint(tags: &dyn TagSource, tag: Tag) -> Option<u32> {
    tags.value(tag)?.get_uint(0)
}

// ============================================================================
// Capture timestamp
// ============================================================================

/// One link in the capture-time fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// `DateTimeOriginal` in the Exif IFD.
    Original,
    /// `DateTimeOriginal` stored in IFD0.
    OriginalInPrimary,
    /// `DateTime`, the last-modified tag.
    Modified,
}

const TIMESTAMP_CHAIN: [TimestampSource; 3] = [
    TimestampSource::Original,
    TimestampSource::OriginalInPrimary,
    TimestampSource::Modified,
];

impl TimestampSource {
    fn tag(self) -> Tag {
        match self {
            TimestampSource::Original => Tag::DateTimeOriginal,
            TimestampSource::OriginalInPrimary => Tag(Context::Tiff, 0x9003),
            TimestampSource::Modified => Tag::DateTime,
        }
    }

    pub fn extract(self, tags: &dyn TagSource) -> Result<NaiveDateTime, MetadataError> {
        let raw = ascii(tags, self.tag()).ok_or(MetadataError::MissingTag(self.tag()))?;
        parse_exif_datetime(&raw).ok_or(MetadataError::BadTimestamp(raw))
    }
}

/// Parse the EXIF `YYYY:MM:DD HH:MM:SS` layout.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT).ok()
}

/// Filesystem modification time in local time.
pub fn file_mtime(path: &Path) -> Result<NaiveDateTime, MetadataError> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Resolve the capture time: EXIF chain first, then the file mtime.
///
/// Returns the Unix epoch only if the file cannot even be stat'ed.
pub fn resolve_timestamp(tags: Option<&dyn TagSource>, path: &Path) -> NaiveDateTime {
    tags.and_then(|tags| {
        TIMESTAMP_CHAIN.iter().find_map(|source| match source.extract(tags) {
            Ok(dt) => Some(dt),
            Err(e) => {
                trace!(?path, ?source, "timestamp source skipped: {}", e);
                None
            }
        })
    })
    .or_else(|| file_mtime(path).ok())
    .unwrap_or_default()
}

// ============================================================================
// Orientation
// ============================================================================

/// Rotation needed to display an image upright, in counter-clockwise degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Ccw90,
    Ccw180,
    Ccw270,
}

impl Rotation {
    /// Map an EXIF orientation flag. Mirrored orientations are left alone.
    pub fn from_orientation(flag: u32) -> Option<Self> {
        match flag {
            3 => Some(Rotation::Ccw180),
            6 => Some(Rotation::Ccw270),
            8 => Some(Rotation::Ccw90),
            _ => None,
        }
    }

    /// The same rotation expressed clockwise, as lossless JPEG tools expect.
    pub fn clockwise_degrees(self) -> u32 {
        match self {
            Rotation::Ccw90 => 270,
            Rotation::Ccw180 => 180,
            Rotation::Ccw270 => 90,
        }
    }
}

pub fn orientation_rotation(tags: &dyn TagSource) -> Option<Rotation> {
    uint(tags, Tag::Orientation).and_then(Rotation::from_orientation)
}

// ============================================================================
// GPS
// ============================================================================

fn degrees(dms: &[f64]) -> Option<f64> {
    match dms {
        [d, m, s, ..] => Some(d + m / 60.0 + s / 3600.0),
        _ => None,
    }
}

/// Build a signed coordinate from degree/minute/second triples and
/// hemisphere references.
///
/// Returns `None` when either axis has fewer than three components or the
/// position sits on the (0, 0) null-fix sentinel.
pub fn gps_coordinate(
    latitude: &[f64],
    latitude_ref: &str,
    longitude: &[f64],
    longitude_ref: &str,
) -> Option<GpsCoordinate> {
    let mut lat = degrees(latitude)?;
    let mut lon = degrees(longitude)?;
    if latitude_ref.trim().starts_with(['S', 's']) {
        lat = -lat;
    }
    if longitude_ref.trim().starts_with(['W', 'w']) {
        lon = -lon;
    }
    if lat.abs() < NULL_GPS_EPSILON && lon.abs() < NULL_GPS_EPSILON {
        return None;
    }
    Some(GpsCoordinate::new(lat, lon))
}

pub fn gps_from_tags(tags: &dyn TagSource) -> Option<GpsCoordinate> {
    let lat = rationals(tags, Tag::GPSLatitude)?;
    let lat_ref = ascii(tags, Tag::GPSLatitudeRef)?;
    let lon = rationals(tags, Tag::GPSLongitude)?;
    let lon_ref = ascii(tags, Tag::GPSLongitudeRef)?;
    gps_coordinate(&lat, &lat_ref, &lon, &lon_ref)
}

// ============================================================================
// Camera identification
// ============================================================================

/// Display name for the camera: model without a duplicated make prefix,
/// followed by the lens model if known.
///
/// `("Canon", "Canon EOS R5")` → `"EOS R5"`.
pub fn camera_name(make: Option<&str>, model: Option<&str>, lens: Option<&str>) -> Option<String> {
    let body = match (make, model) {
        (Some(make), Some(model)) => {
            let stripped = model
                .strip_prefix(make)
                .map(|rest| {
                    rest.strip_prefix([' ', '-', '_', '/']).unwrap_or(rest)
                })
                .unwrap_or(model)
                .trim();
            if stripped.is_empty() {
                Some(make.to_string())
            } else {
                Some(stripped.to_string())
            }
        }
        (None, Some(model)) => Some(model.to_string()),
        (Some(make), None) => Some(make.to_string()),
        (None, None) => None,
    };
    match (body, lens) {
        (Some(body), Some(lens)) => Some(format!("{}, {}", body, lens)),
        (Some(body), None) => Some(body),
        (None, Some(lens)) => Some(lens.to_string()),
        (None, None) => None,
    }
}

// ============================================================================
// Normalized record
// ============================================================================

/// Normalized attribute set for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    pub taken: NaiveDateTime,
    pub camera: Option<String>,
    pub f_number: Option<f64>,
    pub exposure_time: Option<f64>,
    pub focal_length: Option<f64>,
    pub focal_length_35mm: Option<f64>,
    pub iso: Option<u32>,
    pub gps: Option<GpsCoordinate>,
    pub rotation: Option<Rotation>,
    /// EXIF `ImageDescription`.
    pub description: Option<String>,
}

/// Parse the EXIF container of a file, if it has one.
pub fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Some(exif),
        Err(e) => {
            debug!(?path, "no EXIF data: {}", e);
            None
        }
    }
}

/// Read and normalize the metadata of `path`.
pub fn extract(path: &Path) -> ImageMetadata {
    let exif = read_exif(path);
    from_tags(exif.as_ref().map(|e| e as &dyn TagSource), path)
}

/// Normalize an already-parsed tag set. `path` backs the mtime fallback.
pub fn from_tags(tags: Option<&dyn TagSource>, path: &Path) -> ImageMetadata {
    let taken = resolve_timestamp(tags, path);
    let Some(tags) = tags else {
        return ImageMetadata {
            taken,
            ..Default::default()
        };
    };

    let make = ascii(tags, Tag::Make);
    let model = ascii(tags, Tag::Model);
    let lens = ascii(tags, Tag::LensModel);

    ImageMetadata {
        taken,
        camera: camera_name(make.as_deref(), model.as_deref(), lens.as_deref()),
        f_number: rational(tags, Tag::FNumber).filter(|v| *v > 0.0),
        exposure_time: rational(tags, Tag::ExposureTime).filter(|v| *v > 0.0),
        focal_length: rational(tags, Tag::FocalLength).filter(|v| *v > 0.0),
        focal_length_35mm: uint(tags, Tag::FocalLengthIn35mmFilm)
            .filter(|v| *v > 0)
            .map(f64::from),
        iso: uint(tags, Tag::PhotographicSensitivity).filter(|v| *v > 0),
        gps: gps_from_tags(tags),
        rotation: orientation_rotation(tags),
        description: ascii(tags, Tag::ImageDescription),
    }
}

// ============================================================================
// File helpers
// ============================================================================

/// Whether the extension names a raw camera format.
pub fn is_raw(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| RAW_EXTENSIONS.iter().any(|r| e.eq_ignore_ascii_case(r)))
}

/// A same-stem JPEG next to `path` (e.g. the camera JPEG of a RAW+JPEG pair).
pub fn sidecar_preview(path: &Path) -> Option<PathBuf> {
    ["jpg", "JPG", "jpeg", "JPEG"]
        .iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate != path && candidate.is_file())
}

/// Resolve a metadata field from multiple sources.
///
/// Returns the first non-None, non-empty value, trimmed.
///
/// ```text
/// caption: resolve(&[sidecar_text, exif_description])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Read a sidecar `.txt` file for an image.
///
/// Given `photos/IMG_0001.jpg`, looks for `photos/IMG_0001.txt`.
/// Returns `None` if the file doesn't exist or is blank.
pub fn read_sidecar(image_path: &Path) -> Option<String> {
    let sidecar = image_path.with_extension("txt");
    std::fs::read_to_string(sidecar)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
