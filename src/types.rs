//! Shared types passed from the record builder to the renderer.
//!
//! An [`ImageRecord`] is built once per input file by [`process`](crate::process)
//! and never mutated afterwards; [`generate`](crate::generate) only reads it.

use crate::naming;
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// A resolved GPS position in signed decimal degrees.
///
/// South latitudes and west longitudes are negative.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// Place name from the geocoder, or the raw `lat/lon` fallback.
    pub place: Option<String>,
}

impl GpsCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            place: None,
        }
    }
}

/// Human-readable fragments shown on thumbnails and in the lightbox.
///
/// Every field is independently optional: a missing or malformed tag just
/// leaves its fragment out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Details {
    /// Camera model (make prefix stripped) plus lens model.
    pub camera: Option<String>,
    pub f_number: Option<String>,
    pub exposure: Option<String>,
    pub focal_length: Option<String>,
    /// Bare ISO value, used on the thumbnail line.
    pub iso: Option<String>,
    /// `ISO<value>`, used in the detail table.
    pub iso_label: Option<String>,
    /// `f-number exposure focal ISO`, whichever are present.
    pub focus_summary: Option<String>,
    pub flash: Option<String>,
    pub subject_distance: Option<String>,
    pub focus_range: Option<String>,
    pub focus_mode: Option<String>,
    pub software: Option<String>,
    pub exposure_value: Option<String>,
    pub light_value: Option<String>,
}

impl Details {
    /// Labeled rows for the lightbox detail table, in display order.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        [
            ("Camera", &self.camera),
            ("Aperture", &self.f_number),
            ("Exposure", &self.exposure),
            ("Focal length", &self.focal_length),
            ("Sensitivity", &self.iso_label),
            ("Flash", &self.flash),
            ("Focus mode", &self.focus_mode),
            ("Subject distance", &self.subject_distance),
            ("Focus range", &self.focus_range),
            ("Exposure value", &self.exposure_value),
            ("Light value", &self.light_value),
            ("Software", &self.software),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}

/// One gallery entry per input file.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Source path relative to the working directory.
    pub source: PathBuf,
    /// Thumbnail URL relative to the output directory.
    pub thumbnail: String,
    /// Browser-displayable preview for raw sources, relative to the output directory.
    pub preview: Option<String>,
    /// Thumbnail pixel dimensions.
    pub thumbnail_size: (u32, u32),
    /// Capture time. Falls back to the file modification time, never absent.
    pub taken: NaiveDateTime,
    pub gps: Option<GpsCoordinate>,
    pub caption: Option<String>,
    pub details: Details,
    /// Section heading key for in-page grouping.
    pub group_key: Option<String>,
    /// Partition key for multi-file output.
    pub split_key: Option<String>,
}

impl ImageRecord {
    /// The lightbox target: the extracted preview for raw files, else the source.
    pub fn display_target(&self) -> String {
        match &self.preview {
            Some(preview) => preview.clone(),
            None => self.source_url(),
        }
    }

    /// Source path as a forward-slash URL.
    pub fn source_url(&self) -> String {
        naming::url_from_path(&self.source)
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
