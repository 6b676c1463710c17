//! Per-file record building.
//!
//! First stage of a run. Every input file goes through the same sequence and
//! comes out as one [`ImageRecord`], or is skipped with a warning:
//!
//! ```text
//! source ─┬─ EXIF (timestamp, orientation, GPS, camera, exposure)
//!         ├─ metadata tool (flash, focus distances, EV/LV, crop factor)
//!         ├─ caption (sidecar .txt, then ImageDescription)
//!         ├─ in-place edits (resize, scrub, copyright, caption), confirmed only
//!         ├─ raw? extract preview → rotate losslessly
//!         ├─ thumbnail: sibling .thumbnails/ | reuse | generate
//!         ├─ place name (geocoder, cache first)
//!         └─ group / split keys
//! ```
//!
//! ## Thumbnail sources
//!
//! In order of preference, the first two only when `thumbnails.reuse` is on:
//! 1. `<source dir>/.thumbnails/<name>`, copied in.
//! 2. A file already in the thumbnail directory from a previous run.
//! 3. Freshly generated with the [`ImageBackend`].
//!
//! Whichever applies, the name is claimed in the [`ThumbnailStore`] so the
//! end-of-run sweep keeps it.
//!
//! ## Failure handling
//!
//! Nothing here aborts the run. An undecodable source falls back to a
//! same-stem JPEG next to it; a raw file whose preview cannot be extracted
//! does the same. Files with neither are skipped.

use crate::cache::LocationCache;
use crate::config::{EditsConfig, GalleryConfig};
use crate::format;
use crate::geocode::DynGeocoder;
use crate::grouping::{self, Grouping, SplitBy};
use crate::imaging::{
    self, BackendError, Dimensions, ImageBackend, Quality, ThumbnailConfig, create_thumbnail,
};
use crate::metadata::{self, ImageMetadata, Rotation};
use crate::naming;
use crate::thumbs::{self, ThumbnailStore};
use crate::tools::{MetadataTool, RotateTool, ToolError, ToolTags};
use crate::types::{Details, ImageRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Metadata tool failed: {0}")]
    Tool(#[from] ToolError),
    #[error("Source image not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("{0} is outside the working directory")]
    OutsideRoot(PathBuf),
}

/// Settings for record building, derived from [`GalleryConfig`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Working directory. Record paths are relative to it.
    pub root: PathBuf,
    /// Thumbnail directory as it appears in page URLs.
    pub thumbnail_url: String,
    pub thumbnail: ThumbnailConfig,
    pub reuse: bool,
    pub sidecar_captions: bool,
    pub group_by: Option<Grouping>,
    pub split_by: Option<SplitBy>,
    /// Zoom level when geocoding is enabled.
    pub geocode_zoom: Option<u8>,
    pub edits: EditsConfig,
}

impl ProcessConfig {
    pub fn from_config(config: &GalleryConfig, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            thumbnail_url: config
                .thumbnails
                .dir
                .replace('\\', "/")
                .trim_end_matches('/')
                .to_string(),
            thumbnail: ThumbnailConfig {
                max_edge: config.thumbnails.size,
                quality: Quality::new(config.thumbnails.quality),
            },
            reuse: config.thumbnails.reuse,
            sidecar_captions: config.captions.sidecar,
            group_by: config.gallery.group_by,
            split_by: config.gallery.split_by,
            geocode_zoom: config.geocode.enabled.then_some(config.geocode.zoom),
            edits: config.edits.clone(),
        }
    }

    /// Directory the thumbnail store manages.
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.root.join(&self.thumbnail_url)
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.thumbnail_url, name)
    }
}

/// Collaborators and run-wide state for [`build_records`].
pub struct ProcessContext<'a> {
    pub backend: &'a dyn ImageBackend,
    pub tool: &'a dyn MetadataTool,
    pub rotator: &'a dyn RotateTool,
    /// Present when geocoding is enabled.
    pub geocoder: Option<DynGeocoder>,
    pub cache: LocationCache,
    pub store: ThumbnailStore,
}

/// Counters for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub skipped: usize,
    pub generated: usize,
    pub reused: usize,
    pub from_sibling: usize,
    pub previews: usize,
    pub edited: usize,
}

#[derive(Debug, Default)]
pub struct ProcessReport {
    pub records: Vec<ImageRecord>,
    pub stats: ProcessStats,
}

/// Build one record per file, in input order.
pub fn build_records(
    files: &[PathBuf],
    config: &ProcessConfig,
    ctx: &mut ProcessContext,
) -> ProcessReport {
    let mut report = ProcessReport::default();
    for file in files {
        match build_record(file, config, ctx, &mut report.stats) {
            Ok(record) => report.records.push(record),
            Err(e) => {
                warn!(path = %file.display(), "skipping: {}", e);
                report.stats.skipped += 1;
            }
        }
    }
    info!(
        records = report.records.len(),
        skipped = report.stats.skipped,
        "built records"
    );
    report
}

fn build_record(
    file: &Path,
    config: &ProcessConfig,
    ctx: &mut ProcessContext,
    stats: &mut ProcessStats,
) -> Result<ImageRecord, ProcessError> {
    if !file.is_file() {
        return Err(ProcessError::SourceNotFound(file.to_path_buf()));
    }
    let relative = file
        .strip_prefix(&config.root)
        .map_err(|_| ProcessError::OutsideRoot(file.to_path_buf()))?
        .to_path_buf();
    debug!(path = %relative.display(), "processing");

    let meta = metadata::extract(file);
    let tool_tags = ctx.tool.read_tags(file).unwrap_or_else(|e| {
        debug!(path = %relative.display(), "no detailed tags: {}", e);
        ToolTags::default()
    });
    let sidecar = config
        .sidecar_captions
        .then(|| metadata::read_sidecar(file))
        .flatten();
    let caption = metadata::resolve(&[sidecar.as_deref(), meta.description.as_deref()]);

    if config.edits.confirm && config.edits.any() {
        apply_edits(file, caption.as_deref(), &config.edits, ctx);
        stats.edited += 1;
    }

    let (pixels, rotation, preview) = if metadata::is_raw(file) {
        let (pixels, url) = raw_preview(file, &relative, meta.rotation, config, ctx, stats)?;
        (pixels, None, Some(url))
    } else {
        (file.to_path_buf(), meta.rotation, None)
    };

    let name = naming::thumbnail_name(&relative);
    let dims = thumbnail(file, &pixels, rotation, &name, config, ctx, stats)?;

    let mut gps = meta.gps.clone();
    if let (Some(gps), Some(geocoder), Some(zoom)) =
        (gps.as_mut(), ctx.geocoder.as_mut(), config.geocode_zoom)
    {
        gps.place = Some(geocoder.resolve(&mut ctx.cache, gps.latitude, gps.longitude, zoom));
    }

    Ok(ImageRecord {
        thumbnail: config.url(&name),
        preview,
        thumbnail_size: (dims.width, dims.height),
        taken: meta.taken,
        gps,
        caption,
        details: details(&meta, &tool_tags),
        group_key: config.group_by.map(|g| grouping::group_key(g, meta.taken)),
        split_key: config.split_by.map(|s| grouping::split_key(s, meta.taken)),
        source: relative,
    })
}

/// Make sure a browser-displayable preview of a raw file exists in the
/// thumbnail directory. Returns its path and URL.
fn raw_preview(
    file: &Path,
    relative: &Path,
    rotation: Option<Rotation>,
    config: &ProcessConfig,
    ctx: &mut ProcessContext,
    stats: &mut ProcessStats,
) -> Result<(PathBuf, String), ProcessError> {
    let name = naming::preview_name(relative);
    let path = ctx.store.path(&name);
    let reusable = ctx.store.is_reusable(&name, config.reuse);
    ctx.store.claim(&name);
    if reusable {
        debug!(%name, "reusing preview");
        return Ok((path, config.url(&name)));
    }

    match ctx.tool.extract_preview(file, &path) {
        Ok(()) => {
            stats.previews += 1;
            if let Some(rotation) = rotation {
                if let Err(e) = ctx.rotator.rotate_in_place(&path, rotation) {
                    warn!(%name, "preview left unrotated: {}", e);
                }
            }
            Ok((path, config.url(&name)))
        }
        Err(e) => {
            let sidecar = metadata::sidecar_preview(file).ok_or(e)?;
            let url = sidecar
                .strip_prefix(&config.root)
                .map(naming::url_from_path)
                .map_err(|_| ProcessError::OutsideRoot(sidecar.clone()))?;
            debug!(path = %sidecar.display(), "using JPEG sidecar as preview");
            Ok((sidecar, url))
        }
    }
}

/// Produce thumbnail `name` and return its pixel size.
fn thumbnail(
    source: &Path,
    pixels: &Path,
    rotation: Option<Rotation>,
    name: &str,
    config: &ProcessConfig,
    ctx: &mut ProcessContext,
    stats: &mut ProcessStats,
) -> Result<Dimensions, ProcessError> {
    let output = ctx.store.path(name);
    let reusable = ctx.store.is_reusable(name, config.reuse);
    ctx.store.claim(name);

    if let Some(sibling) = thumbs::sibling_thumbnail(source, name).filter(|_| config.reuse) {
        std::fs::copy(&sibling, &output)?;
        if let Ok(dims) = ctx.backend.identify(&output) {
            debug!(%name, "copied sibling thumbnail");
            stats.from_sibling += 1;
            return Ok(dims);
        }
    }

    if reusable {
        match ctx.backend.identify(&output) {
            Ok(dims) => {
                debug!(%name, "reusing thumbnail");
                stats.reused += 1;
                return Ok(dims);
            }
            Err(e) => debug!(%name, "existing thumbnail unreadable, regenerating: {}", e),
        }
    }

    let dims = match create_thumbnail(ctx.backend, pixels, &output, &config.thumbnail, rotation) {
        Ok(dims) => dims,
        Err(BackendError::Decode(reason)) => {
            let Some(sidecar) = metadata::sidecar_preview(source) else {
                return Err(BackendError::Decode(reason).into());
            };
            debug!(path = %sidecar.display(), "undecodable, using JPEG sidecar");
            let sidecar_rotation = metadata::extract(&sidecar).rotation;
            create_thumbnail(
                ctx.backend,
                &sidecar,
                &output,
                &config.thumbnail,
                sidecar_rotation,
            )?
        }
        Err(e) => return Err(e.into()),
    };
    stats.generated += 1;
    Ok(dims)
}

/// Rewrite the source in place. Each failure is logged and the rest still run.
fn apply_edits(file: &Path, caption: Option<&str>, edits: &EditsConfig, ctx: &ProcessContext) {
    if let Some(max_edge) = edits.resize {
        if metadata::is_raw(file) {
            debug!(path = %file.display(), "raw files are not resized");
        } else {
            let preserve = |from: &Path, to: &Path| {
                if let Err(e) = ctx.tool.copy_tags(from, to) {
                    warn!(path = %from.display(), "metadata not carried over resize: {}", e);
                }
            };
            match imaging::resize_in_place(ctx.backend, file, max_edge, Quality::default(), preserve)
            {
                Ok(Some(dims)) => {
                    info!(path = %file.display(), width = dims.width, height = dims.height, "resized")
                }
                Ok(None) => {}
                Err(e) => warn!(path = %file.display(), "resize failed: {}", e),
            }
        }
    }

    if edits.scrub {
        if let Err(e) = ctx.tool.scrub(file) {
            warn!(path = %file.display(), "scrub failed: {}", e);
        }
    }

    let mut tags: Vec<(&str, &str)> = Vec::new();
    if let Some(copyright) = &edits.copyright {
        tags.push(("Copyright", copyright.as_str()));
    }
    if edits.caption_to_metadata {
        if let Some(caption) = caption {
            tags.push(("ImageDescription", caption));
        }
    }
    if !tags.is_empty() {
        if let Err(e) = ctx.tool.write_tags(file, &tags) {
            warn!(path = %file.display(), "writing tags failed: {}", e);
        }
    }
}

/// Formatted detail fragments from EXIF values plus tool-only tags.
pub fn details(meta: &ImageMetadata, tags: &ToolTags) -> Details {
    let f_number = meta.f_number.map(format::f_number);
    let exposure = meta.exposure_time.map(format::exposure_time);
    let focal_length = meta
        .focal_length
        .map(|mm| format::focal_length(mm, meta.focal_length_35mm, tags.crop_factor));
    let iso = meta.iso.map(format::iso);

    let mut details = Details {
        camera: meta.camera.clone(),
        focus_summary: format::focus_summary(
            f_number.as_deref(),
            exposure.as_deref(),
            focal_length.as_deref(),
            iso.as_deref(),
        ),
        iso_label: meta.iso.map(format::iso_label),
        f_number,
        exposure,
        focal_length,
        iso,
        ..Default::default()
    };
    tags.fill_details(&mut details);
    details
}

// ============================================================================
// Tests
// ============================================================================
