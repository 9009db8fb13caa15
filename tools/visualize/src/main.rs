//! Diagnostic visualizer: writes one PNG per render layer to data/debug/.
//! Records are synthetic (seeded), so successive runs are comparable.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use aquagrid_core::coords::INDIA_BOUNDS;
use aquagrid_core::filter::{filter_subset, FilterSpec};
use aquagrid_core::geometry::fit_to_bounds;
use aquagrid_core::record::{CellRecord, LandUse};
use aquagrid_core::render::overlay::{LayerToggles, OverlayKind};
use aquagrid_core::render::raster::RasterSurface;
use aquagrid_core::render::{draw_frame, FrameInput};
use aquagrid_core::synth::pad_to_target;

const W: u32 = 900;
const H: u32 = 1000;
const SEED: u64 = 42;
const CELLS: usize = 1000;

const METALS: [(&str, f64); 5] = [("As", 0.01), ("Pb", 0.01), ("Cr", 0.05), ("Hg", 0.006), ("Fe", 0.3)];
const LAND_USES: [LandUse; 5] = [LandUse::Agri, LandUse::Industrial, LandUse::Urban, LandUse::Mixed, LandUse::Forest];

// ── Synthetic data ───────────────────────────────────────────────────────────

fn seed_record(rng: &mut StdRng, i: usize) -> CellRecord {
    let lat = rng.gen_range(INDIA_BOUNDS.min_lat + 2.0..INDIA_BOUNDS.max_lat - 4.0);
    let lon = rng.gen_range(INDIA_BOUNDS.min_lon + 2.0..INDIA_BOUNDS.max_lon - 6.0);
    let mut r = CellRecord::new(format!("DBG{i:03}"), lat, lon);
    for (metal, limit) in METALS {
        r.metals.insert(metal.into(), rng.gen_range(0.0..limit * 3.0));
        r.limits.insert(metal.into(), limit);
    }
    r.exceedance_flag = r.any_exceedance();
    r.population_density = rng.gen_range(50.0..30_000.0);
    r.industrial_proximity = rng.gen_range(0.0..150.0);
    r.mining_proximity = rng.gen_range(0.0..60.0);
    r.rainfall = rng.gen_range(200.0..3000.0);
    r.land_use = LAND_USES[i % LAND_USES.len()].clone();
    r.trend = (0..8).map(|k| 0.01 + k as f64 * rng.gen_range(0.0..0.004)).collect();
    r
}

fn write(out_dir: &Path, name: &str, input: &FrameInput) -> Result<()> {
    let mut surface = RasterSurface::new(W, H);
    let stats = draw_frame(&mut surface, input).context("surface has no area")?;
    let path = out_dir.join(name);
    surface.save_png(&path).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "  {name:<24} {} cells, {} overlay passes, {} highlights",
        stats.cells, stats.overlay_passes, stats.highlights
    );
    Ok(())
}

// ── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let seed: Vec<CellRecord> = (0..40).map(|i| seed_record(&mut rng, i)).collect();
    let records = pad_to_target(seed, CELLS, &mut rng);
    println!("Generated {} cells (seed {SEED})", records.len());

    let subset = filter_subset(&records, &FilterSpec::default());
    let transform = fit_to_bounds(W as f64, H as f64);

    let out_dir = Path::new("data/debug");
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    println!("Writing layers to {}/", out_dir.display());
    let base = FrameInput::new(&records, &subset, transform);
    write(out_dir, "base.png", &base)?;

    for kind in OverlayKind::ALL {
        let mut layers = LayerToggles::none();
        layers.set(kind, true);
        let name = format!("{}.png", kind.label().to_lowercase().replace(' ', "_"));
        write(out_dir, &name, &FrameInput { layers, ..base })?;
    }

    // Hover on the first displayed cell, compare the next two.
    let shown: Vec<usize> = subset.indices().take(3).collect();
    let highlights = FrameInput {
        hovered: shown.first().copied(),
        compare: shown.get(1..).unwrap_or(&[]),
        ..base
    };
    write(out_dir, "highlights.png", &highlights)?;

    println!("Done.");
    Ok(())
}
