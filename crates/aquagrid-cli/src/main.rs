//! Offline harness for the risk grid: load records, filter, summarise,
//! export, render to PNG, and persist well-data uploads.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use aquagrid_core::bookmark::MemoryStore;
use aquagrid_core::export::{to_csv, to_json};
use aquagrid_core::filter::{filter_subset, search, FilterSpec, Subset, HOTSPOT_SHARE, SEARCH_LIMIT};
use aquagrid_core::record::{records_from_json, CellRecord};
use aquagrid_core::render::overlay::{LayerToggles, OverlayKind};
use aquagrid_core::render::raster::RasterSurface;
use aquagrid_core::risk::{exceeding_metals, risk_breakdown, RiskTier};
use aquagrid_core::schedule::ManualFrameHost;
use aquagrid_core::summary::{region_summary, DashboardSummary};
use aquagrid_core::synth::{pad_to_target, DEFAULT_TARGET};
use aquagrid_core::upload::{persist_rows, rows_from_json, DEFAULT_BATCH_SIZE};
use aquagrid_core::{GridViewer, ViewerConfig};

mod store;

use store::JsonFileStore;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "aquagrid", about = "Groundwater heavy-metal risk grid: offline tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print dashboard totals for the filtered records
    Summary {
        records: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Also print per-state averages for this state
        #[arg(long)]
        region: Option<String>,
    },
    /// List the records that pass the filter
    Filter {
        records: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Risk breakdown of one record
    Inspect { records: PathBuf, id: String },
    /// Global search over state, district and metal names
    Search {
        records: PathBuf,
        query: String,
        #[arg(long, default_value_t = SEARCH_LIMIT)]
        limit: usize,
    },
    /// Write the filtered records as CSV or JSON
    Export {
        records: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Draw the grid into a PNG
    Render {
        records: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(short, long, default_value = "grid.png")]
        output: PathBuf,
        #[arg(long, default_value_t = 1024)]
        width: u32,
        #[arg(long, default_value_t = 1024)]
        height: u32,
        /// Viewer configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overlays to draw (replaces the configured set)
        #[arg(long, value_enum, value_delimiter = ',')]
        layers: Option<Vec<Layer>>,
        /// Centre on and outline this record
        #[arg(long)]
        focus: Option<String>,
    },
    /// Upsert an uploaded well sheet (JSON rows) into a file-backed store
    Upload {
        sheet: PathBuf,
        #[arg(long, default_value = "wells.json")]
        store: PathBuf,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Grow a seed collection with jittered variants
    Pad {
        records: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TARGET)]
        target: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    district: Option<String>,
    /// Keep records measuring any of these metals
    #[arg(long = "metal")]
    metals: Vec<String>,
    #[arg(long = "land-use")]
    land_uses: Vec<String>,
    #[arg(long, default_value_t = 0.0)]
    min_risk: f64,
    #[arg(long, default_value_t = 1.0)]
    max_risk: f64,
    #[arg(long)]
    exceed_only: bool,
    #[arg(long)]
    hotspots_only: bool,
    #[arg(long)]
    query: Option<String>,
    /// Keep only the riskiest 5% of what the filter lets through
    #[arg(long)]
    hotspot_mode: bool,
    /// Filter as a JSON file; other filter flags are ignored when given
    #[arg(long)]
    filter_file: Option<PathBuf>,
}

impl FilterArgs {
    fn spec(&self) -> Result<FilterSpec> {
        if let Some(path) = &self.filter_file {
            let text = read(path)?;
            return serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()));
        }
        Ok(FilterSpec {
            state: self.state.clone(),
            district: self.district.clone(),
            metals: self.metals.iter().cloned().collect(),
            risk_range: [self.min_risk, self.max_risk],
            exceed_only: self.exceed_only,
            hotspots_only: self.hotspots_only,
            land_uses: self.land_uses.iter().map(|s| s.as_str().into()).collect(),
            depth_range: None,
            query: self.query.clone(),
        })
    }

    fn subset(&self, records: &[CellRecord]) -> Result<Subset> {
        let subset = filter_subset(records, &self.spec()?);
        Ok(if self.hotspot_mode { subset.top_share(HOTSPOT_SHARE) } else { subset })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Layer {
    LandUse,
    Industry,
    Population,
    Rainfall,
    Mining,
}

impl From<Layer> for OverlayKind {
    fn from(l: Layer) -> Self {
        match l {
            Layer::LandUse => OverlayKind::LandUse,
            Layer::Industry => OverlayKind::Industry,
            Layer::Population => OverlayKind::Population,
            Layer::Rainfall => OverlayKind::Rainfall,
            Layer::Mining => OverlayKind::Mining,
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load(path: &Path) -> Result<Vec<CellRecord>> {
    let records = records_from_json(&read(path)?).with_context(|| format!("parsing {}", path.display()))?;
    info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn filtered(records: &[CellRecord], filter: &FilterArgs) -> Result<Vec<CellRecord>> {
    let subset = filter.subset(records)?;
    Ok(subset.records(records).cloned().collect())
}

fn write_out(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn summary(records: &Path, filter: &FilterArgs, region: Option<&str>) -> Result<()> {
    let all = load(records)?;
    let shown = filtered(&all, filter)?;
    let s = DashboardSummary::from_records(&shown);
    println!("records        {}", s.records);
    println!("exceeding      {}", s.exceeding);
    println!("affected pop.  {}", s.affected_population);
    println!("top metals     {}", s.top_metals.join(", "));
    println!("top states     {}", s.top_states.join(", "));
    if let Some(state) = region {
        let r = region_summary(&all, Some(state));
        println!(
            "{state}: {} cells, avg risk {:.3}, {:.2}% exceeding, population {}",
            r.records, r.avg_risk, r.exceed_pct, r.population
        );
    }
    Ok(())
}

fn list(records: &Path, filter: &FilterArgs) -> Result<()> {
    let all = load(records)?;
    let subset = filter.subset(&all)?;
    for entry in subset.iter() {
        let r = &all[entry.index];
        println!(
            "{:<14} {:>8.3} {:>8.3}  {:<18} {:<18} {:.3} {:?}",
            r.id,
            r.lat,
            r.lon,
            r.state,
            r.district,
            entry.risk,
            RiskTier::from_risk(entry.risk)
        );
    }
    println!("{} of {} records", subset.len(), all.len());
    Ok(())
}

fn inspect(records: &Path, id: &str) -> Result<()> {
    let all = load(records)?;
    let Some(r) = all.iter().find(|r| r.id == id) else {
        bail!("no record with id {id:?}");
    };
    let b = risk_breakdown(r);
    println!("{} ({}, {})  {:.4}, {} {}", r.id, r.district, r.state, r.lat, r.lon, r.land_use);
    println!("  exceedance  {:.3}", b.exceed);
    println!("  population  {:.3}", b.population);
    println!("  proximity   {:.3}", b.proximity);
    println!("  trend       {:.3}", b.trend);
    println!("  risk        {:.3} ({:?})", b.total, RiskTier::from_risk(b.total));
    let over = exceeding_metals(r);
    if !over.is_empty() {
        println!("  over limit  {}", over.join(", "));
    }
    Ok(())
}

fn find(records: &Path, query: &str, limit: usize) -> Result<()> {
    let all = load(records)?;
    for i in search(&all, query, limit) {
        let r = &all[i];
        println!("{:<14} {}, {}", r.id, r.district, r.state);
    }
    Ok(())
}

fn export(records: &Path, filter: &FilterArgs, format: Format, output: Option<&Path>) -> Result<()> {
    let shown = filtered(&load(records)?, filter)?;
    let text = match format {
        Format::Csv => to_csv(&shown)?,
        Format::Json => to_json(&shown)?,
    };
    write_out(output, &text)
}

#[allow(clippy::too_many_arguments)]
fn render(
    records: &Path,
    filter: &FilterArgs,
    output: &Path,
    width: u32,
    height: u32,
    config: Option<&Path>,
    layers: Option<&[Layer]>,
    focus: Option<&str>,
) -> Result<()> {
    let config = match config {
        Some(path) => ViewerConfig::from_json(&read(path)?).with_context(|| format!("parsing {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    let mut viewer = GridViewer::new(ManualFrameHost::new(), Box::new(MemoryStore::new()), config);
    viewer.resize(width as f64, height as f64);
    viewer.set_records(load(records)?);
    viewer.set_filter(filter.spec()?);
    viewer.set_hotspot_mode(filter.hotspot_mode);
    if let Some(layers) = layers {
        let mut toggles = LayerToggles::none();
        for &l in layers {
            toggles.set(l.into(), true);
        }
        viewer.set_layers(toggles);
    }
    if let Some(id) = focus {
        if !viewer.focus(id) {
            bail!("record {id:?} is not displayed under this filter");
        }
    }

    let mut surface = RasterSurface::new(width, height);
    let Some(stats) = viewer.frame(&mut surface) else {
        bail!("nothing to draw on a {width}×{height} surface");
    };
    surface
        .save_png(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote {} ({} cells, {} overlay passes)",
        output.display(),
        stats.cells,
        stats.overlay_passes
    );
    Ok(())
}

fn upload(sheet: &Path, store: &Path, batch_size: usize) -> Result<()> {
    let rows = rows_from_json(&read(sheet)?).with_context(|| format!("parsing {}", sheet.display()))?;
    let mut db = JsonFileStore::open(store).with_context(|| format!("opening {}", store.display()))?;
    let report = persist_rows(&mut db, &rows, batch_size).context("persisting uploaded rows")?;
    println!(
        "{} rows in {} batches: {} new, {} changed, {} unchanged, {} skipped (no WLCODE)",
        rows.len(),
        report.batches,
        report.counts.upserted,
        report.counts.modified,
        report.counts.unchanged,
        report.skipped
    );
    println!("Persisted {} documents; store holds {}", report.written(), db.len());
    Ok(())
}

fn pad(records: &Path, target: usize, seed: u64, output: Option<&Path>) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let padded = pad_to_target(load(records)?, target, &mut rng);
    write_out(output, &to_json(&padded)?)
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Summary { records, filter, region } => summary(&records, &filter, region.as_deref()),
        Command::Filter { records, filter } => list(&records, &filter),
        Command::Inspect { records, id } => inspect(&records, &id),
        Command::Search { records, query, limit } => find(&records, &query, limit),
        Command::Export { records, filter, format, output } => {
            export(&records, &filter, format, output.as_deref())
        }
        Command::Render { records, filter, output, width, height, config, layers, focus } => render(
            &records,
            &filter,
            &output,
            width,
            height,
            config.as_deref(),
            layers.as_deref(),
            focus.as_deref(),
        ),
        Command::Upload { sheet, store, batch_size } => upload(&sheet, &store, batch_size),
        Command::Pad { records, target, seed, output } => pad(&records, target, seed, output.as_deref()),
    }
}
