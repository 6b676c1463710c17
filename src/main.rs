use clap::{Parser, Subcommand};
use exif_gal::cache::{self, LocationCache};
use exif_gal::config::{self, GalleryConfig};
use exif_gal::generate::{self, GenerateConfig};
use exif_gal::geocode::DynGeocoder;
use exif_gal::imaging::RustBackend;
use exif_gal::output::{self, RunSummary};
use exif_gal::process::{self, ProcessConfig, ProcessContext};
use exif_gal::scan;
use exif_gal::thumbs::ThumbnailStore;
use exif_gal::tools::{self, Jpegtran};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "exif-gal")]
#[command(about = "Static HTML photo gallery generator driven by EXIF metadata")]
#[command(long_about = "\
Static HTML photo gallery generator driven by EXIF metadata

Photos are ordered by capture time (EXIF DateTimeOriginal, then DateTime,
then the file modification time) and rendered as thumbnail pages in the
working directory:

  photos/
  ├── config.toml            # Optional settings (see gen-config)
  ├── 2020/IMG_0001.jpg
  ├── 2020/IMG_0001.txt      # Optional caption sidecar
  ├── raw/DSC_0042.NEF       # Raw files get an extracted JPEG preview
  ├── index.html             # Generated: every photo
  ├── index-reversed.html    # Generated: same, opposite order
  ├── thumbnails/            # Generated: thumbnails, previews, locations.json
  └── static/                # Generated: gallery.css, lightbox.js

Optional tools: exiftool (detailed tags, raw previews, in-place edits) and
jpegtran (lossless preview rotation).

Run 'exif-gal gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Working directory: pages, thumbnails and config.toml live here
    #[arg(short = 'C', long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Show debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Photos or directories to include (default: the working directory)
    paths: Vec<PathBuf>,

    /// Page title
    #[arg(long)]
    title: Option<String>,

    /// Ordering: time, name or none
    #[arg(long)]
    sort: Option<String>,

    /// Newest first
    #[arg(long)]
    reverse: bool,

    /// Section headings: decade, year, month or day
    #[arg(long)]
    group_by: Option<String>,

    /// One page per decade, year or month
    #[arg(long)]
    split_by: Option<String>,

    /// Resolve GPS positions to place names
    #[arg(long)]
    geocode: bool,

    /// Regenerate every thumbnail
    #[arg(long)]
    no_reuse: bool,

    /// Allow the in-place edits configured under [edits]
    #[arg(long)]
    confirm: bool,

    /// Print one line per photo after processing
    #[arg(long)]
    list: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Process photos and write the gallery pages
    Build(BuildArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::Build(args) => build(&cli.dir, &args)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Command-line flags as a TOML overlay for [`config::load_config`].
fn overrides(args: &BuildArgs) -> toml::Value {
    let mut gallery = toml::Table::new();
    if let Some(title) = &args.title {
        gallery.insert("title".into(), title.clone().into());
    }
    if let Some(sort) = &args.sort {
        gallery.insert("sort".into(), sort.clone().into());
    }
    if args.reverse {
        gallery.insert("reverse".into(), true.into());
    }
    if let Some(group_by) = &args.group_by {
        gallery.insert("group_by".into(), group_by.clone().into());
    }
    if let Some(split_by) = &args.split_by {
        gallery.insert("split_by".into(), split_by.clone().into());
    }

    let mut root = toml::Table::new();
    root.insert("gallery".into(), gallery.into());
    if args.no_reuse {
        root.insert("thumbnails".into(), flag("reuse", false));
    }
    if args.geocode {
        root.insert("geocode".into(), flag("enabled", true));
    }
    if args.confirm {
        root.insert("edits".into(), flag("confirm", true));
    }
    toml::Value::Table(root)
}

fn flag(key: &str, value: bool) -> toml::Value {
    let mut table = toml::Table::new();
    table.insert(key.into(), value.into());
    table.into()
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

fn build(dir: &Path, args: &BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
    let root = dir.canonicalize()?;
    let config: GalleryConfig = config::load_config(&root, Some(overrides(args)))?;
    let process_config = ProcessConfig::from_config(&config, &root);
    let thumbnail_dir = process_config.thumbnail_dir();

    let requested: Vec<PathBuf> = if args.paths.is_empty() {
        vec![root.clone()]
    } else {
        args.paths.iter().map(|p| absolute(p)).collect()
    };
    let excluded = [thumbnail_dir.clone(), root.join(&config.assets.dir)];
    let inputs = scan::collect_inputs(&requested, &excluded);

    let backend = RustBackend::new();
    let tool = tools::detect_metadata_tool();
    debug!(tool = tool.name(), "metadata tool");
    let rotator = Jpegtran;
    let cache_path = cache::cache_path(&thumbnail_dir);
    let mut ctx = ProcessContext {
        backend: &backend,
        tool: tool.as_ref(),
        rotator: &rotator,
        geocoder: config
            .geocode
            .enabled
            .then(|| DynGeocoder::nominatim(&config.geocode.endpoint, &config.geocode.user_agent)),
        cache: LocationCache::load(&cache_path),
        store: ThumbnailStore::open(&thumbnail_dir)?,
    };

    let report = process::build_records(&inputs, &process_config, &mut ctx);
    if args.list {
        for line in output::format_records(&report.records) {
            println!("{}", line);
        }
    }

    let records = report.records.len();
    let generate_config = GenerateConfig::from_config(&config);
    let pages = generate::generate(report.records, &generate_config, &root)?;

    let ProcessContext {
        geocoder,
        cache,
        store,
        ..
    } = ctx;
    let stale = store.sweep()?;
    if cache.is_dirty() {
        if let Err(e) = cache.save(&cache_path) {
            warn!(path = %cache_path.display(), "cannot save location cache: {}", e);
        }
    }

    output::print_run_summary(&RunSummary {
        records,
        stats: report.stats,
        pages: pages.into_iter().map(|p| (p.file_name, p.images)).collect(),
        stale_removed: stale.len(),
        remote_lookups: geocoder.map(|g| g.remote_lookups()).unwrap_or(0),
        cached_places: cache.len(),
    });
    Ok(())
}
