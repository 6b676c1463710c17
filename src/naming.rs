//! Derived file names for thumbnails, raw previews and output pages.
//!
//! Thumbnails are flat: every source path maps to a single file name in the
//! thumbnail directory. Path separators become `_`, a literal `_` or `~`
//! inside a component is escaped with `~`, and the full source file name
//! (extension included) is kept before the added `.jpg`. Distinct sources
//! therefore never share a thumbnail.
//!
//! - `2020/trip/a.png` → `2020_trip_a.png.jpg`
//! - `x/y_z.jpg` → `x_y~_z.jpg.jpg`, while `x_y/z.jpg` → `x~_y_z.jpg.jpg`
//! - `raw/DSC_42.NEF` → `raw_DSC~_42.NEF.jpg` (thumbnail),
//!   `raw_DSC~_42.NEF.preview.jpg` (lightbox)
//!
//! Output pages are named after a slug of their split key, each with a
//! `-reversed` twin: `2020.html`, `2020-reversed.html`.

use std::path::{Component, Path};

const THUMBNAIL_EXTENSION: &str = "jpg";
const PREVIEW_SUFFIX: &str = ".preview.jpg";
const REVERSED_SUFFIX: &str = "-reversed";

const SEPARATOR: char = '_';
const ESCAPE: char = '~';

/// Source path with separators flattened to `_`, reversibly.
fn flattened(relative: &Path) -> String {
    let mut flat = String::new();
    let parts = relative.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy()),
        _ => None,
    });
    for (i, part) in parts.enumerate() {
        if i > 0 {
            flat.push(SEPARATOR);
        }
        for c in part.chars() {
            if c == SEPARATOR || c == ESCAPE {
                flat.push(ESCAPE);
            }
            flat.push(c);
        }
    }
    flat
}

/// Thumbnail file name for a source path relative to the working directory.
pub fn thumbnail_name(relative: &Path) -> String {
    format!("{}.{}", flattened(relative), THUMBNAIL_EXTENSION)
}

/// Extracted preview file name for a raw source.
pub fn preview_name(relative: &Path) -> String {
    format!("{}{}", flattened(relative), PREVIEW_SUFFIX)
}

/// Relative path as a forward-slash URL path.
pub fn url_from_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Output file name for a page stem, optionally the reversed copy.
pub fn page_file_name(stem: &str, reversed: bool) -> String {
    if reversed {
        format!("{}{}.html", stem, REVERSED_SUFFIX)
    } else {
        format!("{}.html", stem)
    }
}

/// Page stem for a split key, e.g. `"March 2020"` → `"March-2020"`.
pub fn split_page_stem(key: &str) -> String {
    let slug = sanitize_slug(key);
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Reduce arbitrary text to `[A-Za-z0-9-]`, collapsing dash runs.
pub fn sanitize_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}
