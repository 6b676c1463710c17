//! Input discovery.
//!
//! Turns the command-line arguments into the ordered list of photos to
//! process. Files named explicitly are taken as given. Directories are walked
//! recursively in file-name order, keeping only recognized image and raw
//! extensions:
//!
//! ```text
//! photos/
//! ├── config.toml          # ignored
//! ├── 2020/
//! │   ├── IMG_0001.jpg     # ✓
//! │   ├── IMG_0001.txt     # caption sidecar, not an input
//! │   ├── DSC_0042.NEF     # ✓ raw
//! │   └── .thumbnails/     # hidden, skipped
//! ├── thumbnails/          # excluded: generated output
//! └── static/              # excluded: generated output
//! ```
//!
//! The same file reached twice (named and inside a walked directory) is only
//! listed once, at its first position.

use crate::metadata;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Extensions the image decoder handles, matched case-insensitively.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// Whether `path` looks like a photo: a decodable image or a raw file.
pub fn is_image(path: &Path) -> bool {
    let decodable = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|i| ext.eq_ignore_ascii_case(i)));
    decodable || metadata::is_raw(path)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Expand `paths` into photo files. Directories listed in `exclude` (and
/// everything below them) are never entered.
pub fn collect_inputs(paths: &[PathBuf], exclude: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();
    let mut push = |path: PathBuf| {
        if seen.insert(path.clone()) {
            inputs.push(path);
        }
    };

    for path in paths {
        if !path.is_dir() {
            push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e) && !exclude.iter().any(|x| e.path() == x));
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_image(entry.path()) => {
                    push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!("cannot read directory entry: {}", e),
            }
        }
    }
    debug!(count = inputs.len(), "collected inputs");
    inputs
}
