//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Pages
//!     index.html (42 photos)
//!     index-reversed.html (42 photos)
//!     2020.html (30 photos)
//!     ...
//!
//! Thumbnails
//!     generated: 3
//!     reused: 38
//!     copied: 1
//!     raw previews: 2
//!     stale removed: 4
//!
//! Places
//!     remote lookups: 1
//!     cached: 12
//!
//! Built 42 photos into 6 pages (1 skipped)
//! ```
//!
//! Sections with nothing to say are left out.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::process::ProcessStats;
use crate::types::ImageRecord;

/// Everything worth reporting about one `build` run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub records: usize,
    pub stats: ProcessStats,
    /// Written page file names with how many photos each shows.
    pub pages: Vec<(String, usize)>,
    pub stale_removed: usize,
    pub remote_lookups: u32,
    pub cached_places: usize,
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

/// `name: count` lines for the non-zero counters only.
fn counter_lines(counters: &[(&str, usize)]) -> Vec<String> {
    counters
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{}{}: {}", indent(1), label, n))
        .collect()
}

pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if !summary.pages.is_empty() {
        lines.push("Pages".to_string());
        for (name, count) in &summary.pages {
            lines.push(format!(
                "{}{} ({})",
                indent(1),
                name,
                plural(*count, "photo", "photos")
            ));
        }
        lines.push(String::new());
    }

    let stats = &summary.stats;
    let thumbnails = counter_lines(&[
        ("generated", stats.generated),
        ("reused", stats.reused),
        ("copied", stats.from_sibling),
        ("raw previews", stats.previews),
        ("stale removed", summary.stale_removed),
    ]);
    if !thumbnails.is_empty() {
        lines.push("Thumbnails".to_string());
        lines.extend(thumbnails);
        lines.push(String::new());
    }

    let places = counter_lines(&[
        ("remote lookups", summary.remote_lookups as usize),
        ("cached", summary.cached_places),
    ]);
    if !places.is_empty() {
        lines.push("Places".to_string());
        lines.extend(places);
        lines.push(String::new());
    }

    if stats.edited > 0 {
        lines.push(format!(
            "Edited {} in place",
            plural(stats.edited, "source", "sources")
        ));
    }

    let mut last = format!(
        "Built {} into {}",
        plural(summary.records, "photo", "photos"),
        plural(summary.pages.len(), "page", "pages")
    );
    if stats.skipped > 0 {
        last.push_str(&format!(" ({} skipped)", stats.skipped));
    }
    lines.push(last);
    lines
}

pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

/// One line per record: source path, capture time, thumbnail.
pub fn format_records(records: &[ImageRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            format!(
                "{} {} → {}",
                r.taken.format("%Y-%m-%d %H:%M"),
                r.source_url(),
                r.thumbnail
            )
        })
        .collect()
}
