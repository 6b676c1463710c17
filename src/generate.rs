//! HTML gallery generation.
//!
//! Final stage of the pipeline. Takes the built [`ImageRecord`]s and writes
//! static HTML pages into the working directory.
//!
//! ## Generated Pages
//!
//! - **Default page** (`index.html`): every image, always written.
//! - **Split pages** (`2020.html`, `March-2020.html`, ...): one per split
//!   period when `gallery.split_by` is set, linked with prev/next.
//! - **Reversed twins** (`index-reversed.html`, `2020-reversed.html`, ...):
//!   the same images in the opposite order. Every page links to its twin.
//!
//! ## Flow
//!
//! ```text
//! records → sort → plan pages → render each page → write
//! ```
//!
//! Within a page a heading is emitted before the first record of every run
//! of identical group keys.
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time and copied next to the pages,
//! unless `assets.base_url` points at a hosted copy:
//! - `static/gallery.css`: layout and lightbox styles
//! - `static/lightbox.js`: click-to-enlarge viewer with keyboard navigation
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::config::{self, GalleryConfig};
use crate::naming;
use crate::types::ImageRecord;
use chrono::NaiveDateTime;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const CSS_STATIC: &str = include_str!("../static/gallery.css");
const JS: &str = include_str!("../static/lightbox.js");

const CSS_FILENAME: &str = "gallery.css";
const JS_FILENAME: &str = "lightbox.js";

const TAKEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record ordering before pages are planned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Capture time.
    #[default]
    Time,
    /// Source path.
    Name,
    /// Input order.
    None,
}

/// Where pages load the stylesheet and script from.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSource {
    /// Copied into this directory, relative to the output root.
    Bundled { dir: String },
    /// Already hosted under this base URL.
    Remote { base_url: String },
}

impl AssetSource {
    fn href(&self, file: &str) -> String {
        match self {
            AssetSource::Bundled { dir } => format!("{}/{}", dir.trim_end_matches('/'), file),
            AssetSource::Remote { base_url } => {
                format!("{}/{}", base_url.trim_end_matches('/'), file)
            }
        }
    }
}

/// Renderer settings, derived from [`GalleryConfig`].
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub title: String,
    pub sort: SortOrder,
    pub reverse: bool,
    /// Write one page per distinct split key in addition to the default page.
    pub split: bool,
    pub index_stem: String,
    pub theme_css: String,
    pub assets: AssetSource,
    /// HTML or Markdown fragment, relative to the output root.
    pub intro: Option<PathBuf>,
}

impl GenerateConfig {
    pub fn from_config(config: &GalleryConfig) -> Self {
        let assets = match &config.assets.base_url {
            Some(base_url) => AssetSource::Remote {
                base_url: base_url.clone(),
            },
            None => AssetSource::Bundled {
                dir: config.assets.dir.clone(),
            },
        };
        Self {
            title: config.gallery.title.clone(),
            sort: config.gallery.sort,
            reverse: config.gallery.reverse,
            split: config.gallery.split_by.is_some(),
            index_stem: config.gallery.index.clone(),
            theme_css: config::generate_theme_css(&config.thumbnails),
            assets,
            intro: config.assets.intro.as_ref().map(PathBuf::from),
        }
    }
}

// ============================================================================
// Ordering and planning
// ============================================================================

/// Stable sort; records with equal keys keep their input order.
pub fn sort_records(records: &mut [ImageRecord], order: SortOrder, reverse: bool) {
    match (order, reverse) {
        (SortOrder::Time, false) => records.sort_by(|a, b| a.taken.cmp(&b.taken)),
        (SortOrder::Time, true) => records.sort_by(|a, b| b.taken.cmp(&a.taken)),
        (SortOrder::Name, false) => records.sort_by(|a, b| a.source.cmp(&b.source)),
        (SortOrder::Name, true) => records.sort_by(|a, b| b.source.cmp(&a.source)),
        (SortOrder::None, _) => {}
    }
}

/// Heading to emit before each record: the group key wherever it differs
/// from the previous record's.
pub fn group_headings<'a>(records: &[&'a ImageRecord]) -> Vec<Option<&'a str>> {
    let mut previous: Option<&str> = None;
    records
        .iter()
        .map(|record| {
            let key = record.group_key.as_deref();
            let heading = match key {
                Some(k) if previous != Some(k) => Some(k),
                _ => None,
            };
            previous = key;
            heading
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    pub label: String,
    pub href: String,
}

/// One output file: which records it shows and where it links.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub file_name: String,
    /// Split key, `None` for the default page.
    pub key: Option<String>,
    pub reversed: bool,
    /// Indices into the sorted record list, in display order.
    pub records: Vec<usize>,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
    /// The same page in the opposite order.
    pub twin: PageLink,
}

struct Partition {
    key: String,
    earliest: NaiveDateTime,
    records: Vec<usize>,
}

/// Group record indices by split key, ordered by period.
fn partitions(records: &[ImageRecord]) -> Vec<Partition> {
    let mut parts: Vec<Partition> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let Some(key) = &record.split_key else {
            continue;
        };
        match parts.iter_mut().find(|p| &p.key == key) {
            Some(part) => {
                part.earliest = part.earliest.min(record.taken);
                part.records.push(idx);
            }
            None => parts.push(Partition {
                key: key.clone(),
                earliest: record.taken,
                records: vec![idx],
            }),
        }
    }
    parts.sort_by(|a, b| a.earliest.cmp(&b.earliest).then_with(|| a.key.cmp(&b.key)));
    parts
}

fn twin_link(stem: &str, reversed: bool) -> PageLink {
    PageLink {
        label: if reversed {
            "Original order".to_string()
        } else {
            "Reverse order".to_string()
        },
        href: naming::page_file_name(stem, !reversed),
    }
}

fn plan(
    stem: &str,
    key: Option<&str>,
    records: &[usize],
    reversed: bool,
    prev: Option<PageLink>,
    next: Option<PageLink>,
) -> PagePlan {
    let mut ordered = records.to_vec();
    if reversed {
        ordered.reverse();
    }
    PagePlan {
        file_name: naming::page_file_name(stem, reversed),
        key: key.map(String::from),
        reversed,
        records: ordered,
        prev,
        next,
        twin: twin_link(stem, reversed),
    }
}

/// Plan every output file for an already sorted record list.
///
/// The default page always comes first. With `split`, each distinct split
/// key gets a forward and a reversed page; prev/next follow period order and
/// stay within the same direction.
pub fn plan_pages(records: &[ImageRecord], split: bool, index_stem: &str) -> Vec<PagePlan> {
    let all: Vec<usize> = (0..records.len()).collect();
    let mut plans = vec![
        plan(index_stem, None, &all, false, None, None),
        plan(index_stem, None, &all, true, None, None),
    ];
    if !split {
        return plans;
    }

    let parts = partitions(records);
    let stems: Vec<String> = parts.iter().map(|p| naming::split_page_stem(&p.key)).collect();
    let link = |pos: usize, reversed: bool| PageLink {
        label: parts[pos].key.clone(),
        href: naming::page_file_name(&stems[pos], reversed),
    };
    for (pos, part) in parts.iter().enumerate() {
        for reversed in [false, true] {
            let prev = pos.checked_sub(1).map(|p| link(p, reversed));
            let next = (pos + 1 < parts.len()).then(|| link(pos + 1, reversed));
            plans.push(plan(
                &stems[pos],
                Some(&part.key),
                &part.records,
                reversed,
                prev,
                next,
            ));
        }
    }
    plans
}

// ============================================================================
// HTML Components
// ============================================================================

/// A page ready to render.
pub struct GalleryPage<'a> {
    pub title: String,
    pub records: Vec<&'a ImageRecord>,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
    pub twin: PageLink,
}

/// Settings shared by every page of a run.
pub struct RenderContext {
    pub css_href: String,
    pub js_href: String,
    pub theme_css: String,
    /// Pre-rendered intro HTML.
    pub intro: Option<String>,
    /// Split pages, listed on the default page.
    pub sections: Vec<PageLink>,
}

/// Percent-encode a relative URL path, keeping `/` separators.
pub fn url_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for b in path.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Renders the base HTML document structure
fn base_document(title: &str, ctx: &RenderContext, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href=(ctx.css_href);
                style { (PreEscaped(&ctx.theme_css)) }
            }
            body {
                (content)
                script src=(ctx.js_href) {}
            }
        }
    }
}

fn pager(page: &GalleryPage) -> Markup {
    html! {
        nav.pager {
            @if let Some(prev) = &page.prev {
                a.prev rel="prev" href=(prev.href) { "← " (prev.label) }
            }
            a.twin href=(page.twin.href) { (page.twin.label) }
            @if let Some(next) = &page.next {
                a.next rel="next" href=(next.href) { (next.label) " →" }
            }
        }
    }
}

/// Renders one thumbnail with its caption line and hidden detail table.
fn render_record(record: &ImageRecord) -> Markup {
    let details = record.details.rows();
    let place = record.gps.as_ref().and_then(|g| g.place.as_deref());
    let (width, height) = record.thumbnail_size;
    html! {
        figure.photo {
            a.lightbox href=(url_path(&record.display_target())) data-caption=[record.caption.as_deref()] {
                img src=(url_path(&record.thumbnail)) width=(width) height=(height)
                    alt=(record.caption.as_deref().unwrap_or(&record.file_name())) loading="lazy";
            }
            figcaption {
                time datetime=(record.taken.format("%Y-%m-%dT%H:%M:%S").to_string()) {
                    (record.taken.format(TAKEN_FORMAT).to_string())
                }
                @if let Some(summary) = &record.details.focus_summary {
                    span.exposure { (summary) }
                }
                @if let Some(place) = place {
                    span.place { (place) }
                }
                @if let Some(caption) = &record.caption {
                    span.caption { (caption) }
                }
                a.download href=(url_path(&record.source_url())) download=(record.file_name()) {
                    "Download"
                }
            }
            @if !details.is_empty() {
                table.details {
                    @for (label, value) in &details {
                        tr {
                            th { (label) }
                            td { (value) }
                        }
                    }
                }
            }
        }
    }
}

/// Renders a full gallery page.
pub fn render_page(page: &GalleryPage, ctx: &RenderContext) -> Markup {
    let headings = group_headings(&page.records);
    let content = html! {
        header.gallery-header {
            h1 { (page.title) }
            (pager(page))
        }
        @if let Some(intro) = &ctx.intro {
            section.intro { (PreEscaped(intro)) }
        }
        @if !ctx.sections.is_empty() {
            nav.sections {
                @for section in &ctx.sections {
                    a href=(section.href) { (section.label) }
                }
            }
        }
        main.gallery {
            @for (record, heading) in page.records.iter().zip(&headings) {
                @if let Some(heading) = heading {
                    h2.group-heading { (heading) }
                }
                (render_record(record))
            }
        }
        footer { (pager(page)) }
    };
    base_document(&page.title, ctx, content)
}

// ============================================================================
// Writing
// ============================================================================

fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::new();
    md_html::push_html(&mut out, Parser::new(markdown));
    out
}

/// Read the intro fragment. Markdown (`.md`) is converted; anything else is
/// inserted verbatim.
fn load_intro(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let is_markdown = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("md"));
            Some(if is_markdown {
                markdown_to_html(&text)
            } else {
                text
            })
        }
        Err(e) => {
            warn!(path = %path.display(), "cannot read intro, skipping: {}", e);
            None
        }
    }
}

fn write_assets(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(CSS_FILENAME), CSS_STATIC)?;
    fs::write(dir.join(JS_FILENAME), JS)?;
    Ok(())
}

/// A page written by [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPage {
    pub file_name: String,
    pub path: PathBuf,
    pub images: usize,
}

/// Sort `records`, then write every planned page into `root`.
///
/// Returns the written pages, default page first.
pub fn generate(
    mut records: Vec<ImageRecord>,
    config: &GenerateConfig,
    root: &Path,
) -> Result<Vec<GeneratedPage>, GenerateError> {
    sort_records(&mut records, config.sort, config.reverse);

    if let AssetSource::Bundled { dir } = &config.assets {
        write_assets(&root.join(dir))?;
    }

    let plans = plan_pages(&records, config.split, &config.index_stem);
    let ctx = RenderContext {
        css_href: config.assets.href(CSS_FILENAME),
        js_href: config.assets.href(JS_FILENAME),
        theme_css: config.theme_css.clone(),
        intro: config.intro.as_ref().and_then(|p| load_intro(&root.join(p))),
        sections: plans
            .iter()
            .filter(|p| !p.reversed)
            .filter_map(|p| {
                p.key.as_ref().map(|key| PageLink {
                    label: key.clone(),
                    href: p.file_name.clone(),
                })
            })
            .collect(),
    };

    let mut written = Vec::with_capacity(plans.len());
    for plan in &plans {
        let page = GalleryPage {
            title: match &plan.key {
                Some(key) => format!("{} · {}", config.title, key),
                None => config.title.clone(),
            },
            records: plan.records.iter().map(|&i| &records[i]).collect(),
            prev: plan.prev.clone(),
            next: plan.next.clone(),
            twin: plan.twin.clone(),
        };
        let path = root.join(&plan.file_name);
        fs::write(&path, render_page(&page, &ctx).into_string())?;
        info!(page = %plan.file_name, images = plan.records.len(), "wrote page");
        written.push(GeneratedPage {
            file_name: plan.file_name.clone(),
            path,
            images: plan.records.len(),
        });
    }
    Ok(written)
}

// ============================================================================
// Tests
// ============================================================================
