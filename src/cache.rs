//! Persistent reverse-geocoding cache.
//!
//! Reverse-geocoding services are slow and rate-limited, so every resolved
//! place name is remembered on disk and reused by later runs. The cache is
//! loaded once at the start of a run, mutated in memory, and written back
//! once at the end.
//!
//! ## Keys
//!
//! Coordinates are rounded to [`KEY_PRECISION`] decimal places (about 110 m
//! of latitude) and joined as `"<lat>,<lon>"`. Each key maps zoom levels
//! (as strings, the way they appear in the JSON file) to place names:
//!
//! ```json
//! {
//!   "version": 1,
//!   "places": {
//!     "48.858,2.294": { "10": "Paris", "14": "Gros-Caillou" }
//!   }
//! }
//! ```
//!
//! Entries are never overwritten: the first name stored for a
//! `(key, zoom)` pair wins for the lifetime of the file.
//!
//! ## Storage
//!
//! The file is [`CACHE_FILENAME`] inside the thumbnail directory, so it
//! travels with the generated thumbnails and is ignored by the stale sweep.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache file within the thumbnail directory.
pub const CACHE_FILENAME: &str = "locations.json";

/// Decimal places kept when rounding coordinates into a key.
pub const KEY_PRECISION: usize = 3;

/// Version of the cache file format. Bump to discard existing caches when
/// the key layout changes.
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationCache {
    pub version: u32,
    /// Coordinate key → zoom level → place name.
    pub places: BTreeMap<String, BTreeMap<String, String>>,
    /// Set whenever a new entry is inserted. Never serialized.
    #[serde(skip)]
    dirty: bool,
}

impl LocationCache {
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            places: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Load from `path`. Returns an empty cache if the file doesn't exist
    /// or can't be parsed.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(cache) if cache.version == CACHE_VERSION => cache,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn get(&self, key: &str, zoom: u8) -> Option<&str> {
        self.places
            .get(key)?
            .get(&zoom.to_string())
            .map(String::as_str)
    }

    /// Store a name unless the `(key, zoom)` pair already has one.
    ///
    /// Returns `true` if the entry was added.
    pub fn insert_if_absent(&mut self, key: &str, zoom: u8, name: &str) -> bool {
        let zooms = self.places.entry(key.to_string()).or_default();
        let zoom = zoom.to_string();
        if zooms.contains_key(&zoom) {
            return false;
        }
        zooms.insert(zoom, name.to_string());
        self.dirty = true;
        true
    }

    /// Whether anything was inserted since load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.places.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Round a coordinate pair into a cache key.
pub fn coordinate_key(latitude: f64, longitude: f64) -> String {
    format!(
        "{:.*},{:.*}",
        KEY_PRECISION, latitude, KEY_PRECISION, longitude
    )
}

/// Resolve the cache file path for a thumbnail directory.
pub fn cache_path(thumbnail_dir: &Path) -> PathBuf {
    thumbnail_dir.join(CACHE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Keys
    // =========================================================================

    #[test]
    fn key_rounds_to_fixed_precision() {
        assert_eq!(coordinate_key(48.858_37, 2.294_48), "48.858,2.294");
        assert_eq!(coordinate_key(-33.0, 151.25), "-33.000,151.250");
    }

    #[test]
    fn nearby_points_share_a_key() {
        assert_eq!(
            coordinate_key(48.858_41, 2.294_52),
            coordinate_key(48.858_39, 2.294_49)
        );
    }

    // =========================================================================
    // Insert / lookup
    // =========================================================================

    #[test]
    fn empty_cache_has_no_entries() {
        let c = LocationCache::empty();
        assert!(c.is_empty());
        assert!(!c.is_dirty());
        assert_eq!(c.get("1.000,2.000", 10), None);
    }

    #[test]
    fn insert_then_get() {
        let mut c = LocationCache::empty();
        assert!(c.insert_if_absent("48.858,2.294", 10, "Paris"));
        assert_eq!(c.get("48.858,2.294", 10), Some("Paris"));
        assert_eq!(c.get("48.858,2.294", 14), None);
        assert!(c.is_dirty());
    }

    #[test]
    fn first_writer_wins() {
        let mut c = LocationCache::empty();
        c.insert_if_absent("k", 10, "First");
        assert!(!c.insert_if_absent("k", 10, "Second"));
        assert_eq!(c.get("k", 10), Some("First"));
    }

    #[test]
    fn zoom_levels_are_independent() {
        let mut c = LocationCache::empty();
        c.insert_if_absent("k", 10, "Paris");
        c.insert_if_absent("k", 14, "Gros-Caillou");
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("k", 14), Some("Gros-Caillou"));
    }

    // =========================================================================
    // Save / Load
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(tmp.path());
        let mut c = LocationCache::empty();
        c.insert_if_absent("48.858,2.294", 10, "Paris");
        c.save(&path).unwrap();

        let loaded = LocationCache::load(&path);
        assert_eq!(loaded.get("48.858,2.294", 10), Some("Paris"));
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn saved_file_uses_string_zoom_keys() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(tmp.path());
        let mut c = LocationCache::empty();
        c.insert_if_absent("1.000,2.000", 12, "Somewhere");
        c.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["places"]["1.000,2.000"]["12"], "Somewhere");
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(LocationCache::load(&cache_path(tmp.path())).is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(tmp.path());
        fs::write(&path, "not json").unwrap();
        assert!(LocationCache::load(&path).is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(tmp.path());
        let json = format!(
            r#"{{"version": {}, "places": {{"k": {{"10": "X"}}}}}}"#,
            CACHE_VERSION + 1
        );
        fs::write(&path, json).unwrap();
        assert!(LocationCache::load(&path).is_empty());
    }
}
