//! Gallery configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by the user file in the working directory, which is in turn
//! overridden by command-line flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [gallery]
//! title = "Photos"
//! sort = "time"             # time | name | none
//! reverse = false
//! # group_by = "month"      # decade | year | month | day
//! # split_by = "year"       # decade | year | month
//! index = "index"           # stem of the always-written default page
//!
//! [thumbnails]
//! size = 150                # longer edge, pixels
//! spacing = 4               # gap between thumbnails, pixels
//! quality = 85
//! reuse = true
//! dir = "thumbnails"
//!
//! [geocode]
//! enabled = false
//! zoom = 10
//!
//! [assets]
//! dir = "static"
//! # base_url = "https://cdn.example.com/gallery"
//! # intro = "intro.md"
//!
//! [captions]
//! sidecar = true
//!
//! [edits]
//! # resize = 2048
//! scrub = false
//! # copyright = "© 2024 A. Person"
//! caption_to_metadata = false
//! confirm = false
//! ```
//!
//! ## In-place edits
//!
//! Everything under `[edits]` rewrites the source photos. Requesting any of
//! them without `confirm = true` (or `--confirm`) is rejected by
//! [`GalleryConfig::validate`] before a single file is read.
//!
//! Unknown keys are rejected to catch typos early.

use crate::generate::SortOrder;
use crate::geocode::DEFAULT_ENDPOINT;
use crate::grouping::{Grouping, SplitBy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "config.toml";

/// Highest zoom level the reverse geocoder understands.
const MAX_ZOOM: u8 = 18;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(
        "in-place edits requested ({}) without confirmation; set edits.confirm = true or pass --confirm",
        .0.join(", ")
    )]
    UnconfirmedEdit(Vec<&'static str>),
}

/// Gallery configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub gallery: GallerySection,
    pub thumbnails: ThumbnailsConfig,
    pub geocode: GeocodeConfig,
    pub assets: AssetsConfig,
    pub captions: CaptionsConfig,
    pub edits: EditsConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges, and that no
    /// in-place edit is requested without confirmation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.thumbnails.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "thumbnails.dir must not be empty".into(),
            ));
        }
        if self.geocode.zoom > MAX_ZOOM {
            return Err(ConfigError::Validation(format!(
                "geocode.zoom must be 0-{}",
                MAX_ZOOM
            )));
        }
        if self.gallery.index.trim().is_empty() {
            return Err(ConfigError::Validation(
                "gallery.index must not be empty".into(),
            ));
        }
        if self.edits.resize == Some(0) {
            return Err(ConfigError::Validation(
                "edits.resize must be non-zero".into(),
            ));
        }
        let requested = self.edits.requested();
        if !requested.is_empty() && !self.edits.confirm {
            return Err(ConfigError::UnconfirmedEdit(requested));
        }
        Ok(())
    }
}

/// Page-level settings: title, ordering, grouping, output names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GallerySection {
    pub title: String,
    pub sort: SortOrder,
    /// Newest first when sorting by time.
    pub reverse: bool,
    /// Insert a heading whenever this period changes.
    pub group_by: Option<Grouping>,
    /// Write one page per period, with prev/next links.
    pub split_by: Option<SplitBy>,
    /// File stem of the default page holding every image.
    pub index: String,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            title: "Photos".to_string(),
            sort: SortOrder::Time,
            reverse: false,
            group_by: None,
            split_by: None,
            index: "index".to_string(),
        }
    }
}

/// Thumbnail generation and layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Longer edge in pixels.
    pub size: u32,
    /// Gap between thumbnails in pixels.
    pub spacing: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
    /// Keep thumbnails from earlier runs instead of regenerating them.
    pub reuse: bool,
    /// Directory, relative to the working directory.
    pub dir: String,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            size: 150,
            spacing: 4,
            quality: 85,
            reuse: true,
            dir: "thumbnails".to_string(),
        }
    }
}

/// Reverse geocoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodeConfig {
    pub enabled: bool,
    /// Detail level: 3 = country, 10 = city, 18 = building.
    pub zoom: u8,
    pub endpoint: String,
    pub user_agent: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            zoom: 10,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: format!("exif-gal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Static asset and page fragment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Where the bundled CSS/JS is copied, relative to the working directory.
    pub dir: String,
    /// Reference assets from here instead of copying them.
    pub base_url: Option<String>,
    /// HTML or Markdown file inserted above the thumbnails.
    pub intro: Option<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: "static".to_string(),
            base_url: None,
            intro: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionsConfig {
    /// Read `<stem>.txt` next to each image.
    pub sidecar: bool,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self { sidecar: true }
    }
}

/// In-place edits of the source photos. All require `confirm`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditsConfig {
    /// Shrink sources so the longer edge is at most this many pixels.
    pub resize: Option<u32>,
    /// Strip metadata except orientation and capture time.
    pub scrub: bool,
    /// Write this string into the Copyright tag.
    pub copyright: Option<String>,
    /// Write the sidecar caption into ImageDescription.
    pub caption_to_metadata: bool,
    pub confirm: bool,
}

impl EditsConfig {
    /// Names of the requested edits, in application order.
    pub fn requested(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.resize.is_some() {
            names.push("resize");
        }
        if self.scrub {
            names.push("scrub");
        }
        if self.copyright.is_some() {
            names.push("copyright");
        }
        if self.caption_to_metadata {
            names.push("caption_to_metadata");
        }
        names
    }

    pub fn any(&self) -> bool {
        !self.requested().is_empty()
    }
}

/// Generate CSS custom properties from thumbnail layout settings.
pub fn generate_theme_css(thumbnails: &ThumbnailsConfig) -> String {
    format!(
        r#":root {{
    --thumbnail-size: {size}px;
    --thumbnail-gap: {gap}px;
}}"#,
        size = thumbnails.size,
        gap = thumbnails.spacing,
    )
}

pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Load config from `dir`, apply command-line `overrides` on top, then
/// deserialize and validate.
pub fn load_config(
    dir: &Path,
    overrides: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let mut merged = stock_defaults_value()?;
    if let Some(file) = load_raw_config(dir)? {
        merged = merge_toml(merged, file);
    }
    if let Some(cli) = overrides {
        merged = merge_toml(merged, cli);
    }
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# exif-gal configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[gallery]
title = "Photos"

# Ordering: "time" (capture time), "name" (source path) or "none" (input order).
sort = "time"
reverse = false

# Section headings whenever the period changes: "decade", "year", "month", "day".
# group_by = "month"

# One page per period, linked with prev/next: "decade", "year", "month".
# split_by = "year"

# Stem of the page that always lists every image (index.html, index-reversed.html).
index = "index"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Longer edge in pixels.
size = 150

# Gap between thumbnails in pixels.
spacing = 4

# JPEG quality (1 = worst, 100 = best).
quality = 85

# Keep thumbnails from earlier runs. Thumbnails of removed photos are
# always deleted.
reuse = true

dir = "thumbnails"

# ---------------------------------------------------------------------------
# Reverse geocoding (GPS -> place name)
# ---------------------------------------------------------------------------
[geocode]
enabled = false

# 3 = country, 10 = city, 14 = suburb, 18 = building.
zoom = 10

endpoint = "https://nominatim.openstreetmap.org/reverse"
# user_agent = "exif-gal/<version>"

# ---------------------------------------------------------------------------
# Assets
# ---------------------------------------------------------------------------
[assets]
# Where the bundled CSS/JS is copied.
dir = "static"

# Reference CSS/JS from a remote base instead of copying.
# base_url = "https://cdn.example.com/gallery"

# HTML (.html) or Markdown (.md) shown above the thumbnails.
# intro = "intro.md"

# ---------------------------------------------------------------------------
# Captions
# ---------------------------------------------------------------------------
[captions]
# Use <stem>.txt next to each photo as its caption.
sidecar = true

# ---------------------------------------------------------------------------
# In-place edits of the SOURCE photos
# ---------------------------------------------------------------------------
# These rewrite your originals. Nothing here runs unless confirm = true.
[edits]
# resize = 2048
scrub = false
# copyright = "© 2024 A. Person"
caption_to_metadata = false
confirm = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn default_config_values() {
        let config = GalleryConfig::default();
        assert_eq!(config.gallery.title, "Photos");
        assert_eq!(config.gallery.sort, SortOrder::Time);
        assert_eq!(config.thumbnails.size, 150);
        assert!(config.thumbnails.reuse);
        assert!(!config.geocode.enabled);
        assert!(config.captions.sidecar);
        assert!(!config.edits.any());
    }

    #[test]
    fn default_config_validates() {
        GalleryConfig::default().validate().unwrap();
    }

    #[test]
    fn stock_toml_matches_defaults() {
        let parsed: GalleryConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = GalleryConfig::default();
        assert_eq!(parsed.gallery.title, defaults.gallery.title);
        assert_eq!(parsed.thumbnails.size, defaults.thumbnails.size);
        assert_eq!(parsed.thumbnails.quality, defaults.thumbnails.quality);
        assert_eq!(parsed.geocode.zoom, defaults.geocode.zoom);
        assert_eq!(parsed.geocode.endpoint, defaults.geocode.endpoint);
        assert_eq!(parsed.assets.dir, defaults.assets.dir);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn zero_thumbnail_size_rejected() {
        let mut config = GalleryConfig::default();
        config.thumbnails.size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn quality_out_of_range_rejected() {
        let mut config = GalleryConfig::default();
        config.thumbnails.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zoom_out_of_range_rejected() {
        let mut config = GalleryConfig::default();
        config.geocode.zoom = 19;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unconfirmed_edits_rejected() {
        let mut config = GalleryConfig::default();
        config.edits.scrub = true;
        config.edits.copyright = Some("© me".into());

        match config.validate() {
            Err(ConfigError::UnconfirmedEdit(names)) => {
                assert_eq!(names, vec!["scrub", "copyright"]);
            }
            other => panic!("expected UnconfirmedEdit, got {:?}", other),
        }
    }

    #[test]
    fn confirmed_edits_accepted() {
        let mut config = GalleryConfig::default();
        config.edits.resize = Some(2048);
        config.edits.confirm = true;
        config.validate().unwrap();
    }

    #[test]
    fn unconfirmed_edit_message_names_the_flag() {
        let err = ConfigError::UnconfirmedEdit(vec!["resize"]);
        let msg = err.to_string();
        assert!(msg.contains("resize"));
        assert!(msg.contains("--confirm"));
    }

    // =========================================================================
    // merge_toml / load_config
    // =========================================================================

    #[test]
    fn merge_overrides_nested_keys_only() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path(), None).unwrap();
        assert_eq!(config.gallery.index, "index");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[gallery]
title = "Holidays"
group_by = "month"
split_by = "year"

[thumbnails]
size = 200
"#,
        )
        .unwrap();

        let config = load_config(tmp.path(), None).unwrap();
        assert_eq!(config.gallery.title, "Holidays");
        assert_eq!(config.gallery.group_by, Some(Grouping::Month));
        assert_eq!(config.gallery.split_by, Some(SplitBy::Year));
        assert_eq!(config.thumbnails.size, 200);
        // Unspecified values should be defaults
        assert_eq!(config.thumbnails.spacing, 4);
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[gallery]\nreverse = false\n[edits]\nscrub = true\n",
        )
        .unwrap();
        let overrides: toml::Value =
            toml::from_str("[gallery]\nreverse = true\n[edits]\nconfirm = true\n").unwrap();

        let config = load_config(tmp.path(), Some(overrides)).unwrap();
        assert!(config.gallery.reverse);
        assert!(config.edits.scrub);
    }

    #[test]
    fn load_config_unconfirmed_edit_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[edits]\nresize = 1024\n").unwrap();
        assert!(matches!(
            load_config(tmp.path(), None),
            Err(ConfigError::UnconfirmedEdit(_))
        ));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[gallery]\ntitel = \"x\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path(), None),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn split_by_day_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[gallery]\nsplit_by = \"day\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path(), None),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(tmp.path(), None),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn theme_css_variables() {
        let css = generate_theme_css(&ThumbnailsConfig::default());
        assert!(css.contains("--thumbnail-size: 150px"));
        assert!(css.contains("--thumbnail-gap: 4px"));
    }
}
