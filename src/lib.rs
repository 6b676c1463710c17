//! # exif-gal
//!
//! A static HTML photo gallery generator. Point it at a directory of photos
//! and it writes thumbnail pages, ordered and grouped by the time each photo
//! was taken, into that same directory.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Process   photos   →  Vec<ImageRecord>   (metadata, thumbnails, place names)
//! 2. Generate  records  →  *.html             (sorted, grouped, split pages)
//! ```
//!
//! The stages share nothing but the [`types::ImageRecord`] list. Processing
//! talks to the outside world through narrow traits ([`imaging::ImageBackend`],
//! [`tools::MetadataTool`], [`tools::RotateTool`], [`geocode::ReverseGeocoder`])
//! so every decision it makes can be tested with recording fakes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Expands command-line paths into the list of photo files |
//! | [`metadata`] | EXIF reading: capture time fallback chain, orientation, GPS, camera, captions |
//! | [`tools`] | External `exiftool` / `jpegtran` capabilities, with a no-op stand-in |
//! | [`format`] | Human-readable exposure, focal length and distance fragments |
//! | [`geocode`] | Reverse geocoding, cache first, remote client built on first miss |
//! | [`cache`] | The `locations.json` place-name cache |
//! | [`grouping`] | Decade / year / month / day keys for headings and page splits |
//! | [`naming`] | Thumbnail, preview and page file names |
//! | [`imaging`] | Pure-Rust thumbnail and resize pipeline |
//! | [`thumbs`] | Thumbnail directory bookkeeping and stale cleanup |
//! | [`process`] | Stage 1: one [`types::ImageRecord`] per input file |
//! | [`generate`] | Stage 2: renders pages with Maud |
//! | [`config`] | `config.toml` loading, CLI overrides, validation |
//! | [`output`] | CLI summary formatting |
//!
//! # Design Decisions
//!
//! ## Output Lives Next to the Photos
//!
//! Pages are written into the working directory and link to the original
//! files by relative path, so the directory can be served or zipped as is.
//! Generated files (thumbnails, raw previews, the location cache, CSS and
//! JavaScript) go into two subdirectories that input discovery skips.
//!
//! ## Degrade, Don't Abort
//!
//! A photo with missing or broken metadata still gets a record; an
//! undecodable one is skipped with a warning. The only fatal configuration
//! error is an in-place edit requested without confirmation, which is
//! rejected before any file is read.
//!
//! ## Incremental Thumbnails
//!
//! Thumbnails from earlier runs are reused by name. Every name produced in a
//! run is claimed, and whatever is left unclaimed at the end belonged to a
//! photo that is gone and is deleted.

pub mod cache;
pub mod config;
pub mod format;
pub mod generate;
pub mod geocode;
pub mod grouping;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod process;
pub mod scan;
pub mod thumbs;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
