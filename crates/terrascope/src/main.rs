use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

use geopick::{DisplayMode, ViewTransform};
use geotable::CategoryGroups;

mod session;

use session::{DataCatalog, Session};

#[derive(Parser)]
#[command(name = "terrascope", about = "Terrain feature inspection tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List raster and entity-table files in a data directory
    Files {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Load a raster and print its header and value statistics
    GridInfo {
        /// Raster file (.asc)
        #[arg(long)]
        asc: PathBuf,
    },

    /// Load an entity table and print per-category counts
    Entities {
        /// Entity table file (.csv)
        #[arg(long)]
        geo: PathBuf,
    },

    /// Find the nearest visible feature around a pixel position
    Pick {
        /// Raster file (.asc)
        #[arg(long)]
        asc: PathBuf,

        /// Entity table file (.csv)
        #[arg(long)]
        geo: PathBuf,

        /// Query position in pixels, as `x,y`
        #[arg(long)]
        at: String,

        /// Pick radius in pixels
        #[arg(long, default_value_t = 10.0)]
        radius: f64,

        /// Which segment layer to query
        #[arg(long, value_enum, default_value_t = ModeArg::Lines)]
        mode: ModeArg,

        /// Comma-separated categories to hide
        /// (maxima, minima, saddles, lines-ascending, lines-descending, areas)
        #[arg(long)]
        hide: Option<String>,

        /// Life filter as `lo:hi`; defaults to the table's full range
        #[arg(long)]
        life: Option<String>,

        /// Render scale in pixels per cell
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Render offset in pixels, as `x,y`
        #[arg(long, default_value = "0,0")]
        offset: String,
    },

    /// Report the grid cell under a pixel position
    Probe {
        /// Raster file (.asc)
        #[arg(long)]
        asc: PathBuf,

        /// Query position in pixels, as `x,y`
        #[arg(long)]
        at: String,

        /// Render scale in pixels per cell
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Render offset in pixels, as `x,y`
        #[arg(long, default_value = "0,0")]
        offset: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Lines,
    Areas,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModeArg::Lines => "lines",
            ModeArg::Areas => "areas",
        };

        f.write_str(s)
    }
}

impl From<ModeArg> for DisplayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Lines => DisplayMode::Lines,
            ModeArg::Areas => DisplayMode::Areas,
        }
    }
}

#[derive(Serialize)]
struct FilesReport {
    data_dir: String,
    rasters: Vec<String>,
    tables: Vec<String>,
}

#[derive(Serialize)]
struct GridReport {
    ncols: usize,
    nrows: usize,
    xllcorner: f64,
    yllcorner: f64,
    cellsize: f64,
    nodata_value: f64,
    min: Option<f64>,
    max: Option<f64>,
    nodata_cells: usize,
}

#[derive(Serialize)]
struct EntitiesReport {
    entities: usize,
    maxima: usize,
    minima: usize,
    saddles: usize,
    lines_ascending: usize,
    lines_descending: usize,
    areas: usize,
    unknown: usize,
    life_min: f64,
    life_max: f64,
}

#[derive(Serialize)]
struct PickReport {
    query: [f64; 2],
    radius: f64,
    hit: Option<HitReport>,
}

#[derive(Serialize)]
struct HitReport {
    id: u32,
    name: String,
    kind: String,
    life: f64,
    distance: f64,
}

#[derive(Serialize)]
struct ProbeReport {
    col: usize,
    row: usize,
    value: f64,
    has_value: bool,
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Files { data_dir } => run_files(&data_dir),
        Commands::GridInfo { asc } => run_grid_info(&asc),
        Commands::Entities { geo } => run_entities(&geo),
        Commands::Pick {
            asc,
            geo,
            at,
            radius,
            mode,
            hide,
            life,
            scale,
            offset,
        } => run_pick(&asc, &geo, &at, radius, mode, hide, life, scale, &offset),
        Commands::Probe {
            asc,
            at,
            scale,
            offset,
        } => run_probe(&asc, &at, scale, &offset),
    }
}

fn run_files(data_dir: &Path) -> Result<()> {
    let catalog = DataCatalog::scan(data_dir)?;

    let report = FilesReport {
        data_dir: data_dir.display().to_string(),
        rasters: file_names(catalog.rasters()),
        tables: file_names(catalog.tables()),
    };

    print_report(&report)
}

fn run_grid_info(asc: &Path) -> Result<()> {
    let grid = ascgrid::load(asc).with_context(|| format!("loading raster {}", asc.display()))?;

    let header = grid.header();
    let nodata_cells = grid.data().iter().filter(|&&v| grid.is_nodata(v)).count();
    let range = grid.value_range();

    let report = GridReport {
        ncols: header.ncols,
        nrows: header.nrows,
        xllcorner: header.xllcorner,
        yllcorner: header.yllcorner,
        cellsize: header.cellsize,
        nodata_value: header.nodata_value,
        min: range.map(|r| r.0),
        max: range.map(|r| r.1),
        nodata_cells,
    };

    print_report(&report)
}

fn run_entities(geo: &Path) -> Result<()> {
    let dataset = geotable::table::load(geo)
        .with_context(|| format!("loading entity table {}", geo.display()))?;
    let groups = CategoryGroups::from_dataset(&dataset);

    let report = EntitiesReport {
        entities: dataset.len(),
        maxima: groups.maxima.len(),
        minima: groups.minima.len(),
        saddles: groups.saddles.len(),
        lines_ascending: groups.lines_ascending.len(),
        lines_descending: groups.lines_descending.len(),
        areas: groups.areas.len(),
        unknown: dataset.len() - groups.total(),
        life_min: dataset.life_min(),
        life_max: dataset.life_max(),
    };

    print_report(&report)
}

#[allow(clippy::too_many_arguments)]
fn run_pick(
    asc: &Path,
    geo: &Path,
    at: &str,
    radius: f64,
    mode: ModeArg,
    hide: Option<String>,
    life: Option<String>,
    scale: f64,
    offset: &str,
) -> Result<()> {
    let query = parse_pair(at)?;
    let view = parse_view(scale, offset)?;

    let mut session = Session::new();
    if !session.load_grid(asc) {
        bail!("could not load raster {}", asc.display());
    }
    if !session.load_entities(geo) {
        bail!("could not load entity table {}", geo.display());
    }

    session.set_display_mode(mode.into());

    if let Some(hidden) = hide.as_deref() {
        apply_hidden(&mut session, hidden)?;
    }

    if let Some(range) = life.as_deref() {
        let (lo, hi) = parse_range(range)?;
        session.set_life_filter(lo, hi);
    }

    let hit = session.pick(query, radius, &view).and_then(|h| {
        session.dataset().map(|dataset| {
            let entity = &dataset.entities()[h.entity];
            HitReport {
                id: entity.id,
                name: entity.name.clone(),
                kind: entity.kind.to_string(),
                life: entity.life,
                distance: h.distance,
            }
        })
    });

    print_report(&PickReport { query, radius, hit })
}

fn run_probe(asc: &Path, at: &str, scale: f64, offset: &str) -> Result<()> {
    let query = parse_pair(at)?;
    let view = parse_view(scale, offset)?;

    let mut session = Session::new();
    if !session.load_grid(asc) {
        bail!("could not load raster {}", asc.display());
    }

    let Some(sample) = session.probe(query, &view) else {
        bail!("no raster loaded");
    };

    print_report(&ProbeReport {
        col: sample.col,
        row: sample.row,
        value: sample.value,
        has_value: sample.has_value,
    })
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);

    Ok(())
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}

/// Parses `x,y` into two floats.
fn parse_pair(text: &str) -> Result<[f64; 2]> {
    let (x, y) = text
        .split_once(',')
        .with_context(|| format!("expected `x,y`, got '{text}'"))?;

    Ok([parse_number(x)?, parse_number(y)?])
}

/// Parses `lo:hi` into two floats.
fn parse_range(text: &str) -> Result<(f64, f64)> {
    let (lo, hi) = text
        .split_once(':')
        .with_context(|| format!("expected `lo:hi`, got '{text}'"))?;

    Ok((parse_number(lo)?, parse_number(hi)?))
}

fn parse_number(text: &str) -> Result<f64> {
    text.trim()
        .parse()
        .with_context(|| format!("invalid number '{}'", text.trim()))
}

fn parse_view(scale: f64, offset: &str) -> Result<ViewTransform> {
    ensure!(scale > 0.0, "--scale must be positive, got {scale}");
    let offset = parse_pair(offset)?;

    Ok(ViewTransform::new(scale, offset[0], offset[1]))
}

fn apply_hidden(session: &mut Session, hidden: &str) -> Result<()> {
    for name in hidden.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.to_ascii_lowercase().as_str() {
            "maxima" => session.set_show_maxima(false),
            "minima" => session.set_show_minima(false),
            "saddles" => session.set_show_saddles(false),
            "lines-ascending" => session.set_show_lines_ascending(false),
            "lines-descending" => session.set_show_lines_descending(false),
            "areas" => session.set_show_areas(false),
            other => bail!("unknown category '{other}'"),
        }
    }

    Ok(())
}
