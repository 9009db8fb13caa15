//! Pads a small seed collection up to a target size with perturbed copies.
//!
//! Copies cycle through the seed in order. Each copy is jittered in place,
//! has its readings rescaled and keeps the rest of its source record.
use log::info;
use rand::Rng;

use crate::coords::{LatLon, INDIA_BOUNDS};
use crate::record::CellRecord;

/// Default padded size.
pub const DEFAULT_TARGET: usize = 1000;

/// Max coordinate offset of a copy, degrees.
const JITTER_DEG: f64 = 0.1;

/// `seed` followed by perturbed copies until `target` records exist. An
/// empty seed stays empty; a seed already at `target` is returned as is.
pub fn pad_to_target<R: Rng>(seed: Vec<CellRecord>, target: usize, rng: &mut R) -> Vec<CellRecord> {
    if seed.is_empty() || seed.len() >= target {
        return seed;
    }
    let mut out = Vec::with_capacity(target);
    out.extend(seed.iter().cloned());

    for base in seed.iter().cycle() {
        if out.len() >= target {
            break;
        }
        let copy = perturb(base, out.len() + 1, rng);
        out.push(copy);
    }
    info!("padded {} seed records to {}", seed.len(), out.len());
    out
}

fn perturb<R: Rng>(base: &CellRecord, n: usize, rng: &mut R) -> CellRecord {
    let mut rec = base.clone();
    rec.id = format!("{}-{n}", base.id);

    let moved = LatLon::new(
        base.lat + rng.gen_range(-JITTER_DEG..JITTER_DEG),
        base.lon + rng.gen_range(-JITTER_DEG..JITTER_DEG),
    );
    let moved = INDIA_BOUNDS.clamp(moved);
    rec.lat = moved.lat;
    rec.lon = moved.lon;

    for v in rec.metals.values_mut() {
        *v = (*v * rng.gen_range(0.7..1.3)).max(0.0);
    }
    for v in rec.trend.iter_mut() {
        *v = (*v * rng.gen_range(0.8..1.2)).max(0.0);
    }
    if rng.gen_bool(0.5) {
        rec.exceedance_flag = !rec.exceedance_flag;
    }
    rec.health_risk_score = (base.health_risk_score + rng.gen_range(-0.1..0.1)).clamp(0.0, 1.0);
    rec
}
