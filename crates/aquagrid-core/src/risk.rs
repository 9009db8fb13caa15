//! Composite contamination risk per cell.
//!
//! risk = 0.5·exceed + 0.2·population + 0.15·proximity + 0.15·trend, clamped to [0, 1]
//!
//!   exceed     = metals over their limit / metals present   (0 with no metals)
//!   population = clamp(density / 25 000)
//!   proximity  = clamp(1 − industrial_km / 50)               (closer → riskier)
//!   trend      = clamp((slope / 0.01 + 1) / 2)               (least-squares slope per sample)
//!
//! The weights and divisors have no external derivation; they are reproduced
//! exactly and are not tunable.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::CellRecord;
use crate::render::color::{Color, AMBER, EMERALD, RED};

// ── Constants ────────────────────────────────────────────────────────────────

pub const W_EXCEED: f64 = 0.5;
pub const W_POPULATION: f64 = 0.2;
pub const W_PROXIMITY: f64 = 0.15;
pub const W_TREND: f64 = 0.15;

/// Population density (people/km²) that saturates the population term.
pub const POPULATION_SATURATION: f64 = 25_000.0;
/// Industrial distance (km) at which the proximity term reaches zero.
pub const PROXIMITY_RANGE_KM: f64 = 50.0;
/// Slope magnitude per sample mapped to the ends of the trend term.
pub const TREND_SLOPE_SCALE: f64 = 0.01;

/// Inclusive lower bound of the hotspot tier.
pub const HOTSPOT_THRESHOLD: f64 = 0.66;
/// Inclusive lower bound of the moderate tier.
pub const MODERATE_THRESHOLD: f64 = 0.33;

// ── Scoring ──────────────────────────────────────────────────────────────────

/// Normalised inputs and the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskBreakdown {
    pub exceed: f64,
    pub population: f64,
    pub proximity: f64,
    pub trend: f64,
    pub total: f64,
}

pub fn compute_risk(record: &CellRecord) -> f64 {
    risk_breakdown(record).total
}

pub fn risk_breakdown(record: &CellRecord) -> RiskBreakdown {
    breakdown_with_metals(record, &record.metals)
}

/// Score `record` as if some concentrations were replaced by `overrides`.
/// Metals absent from the record are added.
pub fn compute_risk_with_overrides(record: &CellRecord, overrides: &BTreeMap<String, f64>) -> f64 {
    let mut metals = record.metals.clone();
    for (metal, &v) in overrides {
        metals.insert(metal.clone(), v.max(0.0));
    }
    breakdown_with_metals(record, &metals).total
}

fn breakdown_with_metals(record: &CellRecord, metals: &BTreeMap<String, f64>) -> RiskBreakdown {
    let exceeded = metals
        .iter()
        .filter(|(m, v)| **v > record.limit(m))
        .count();
    let exceed = unit(exceeded as f64 / metals.len().max(1) as f64);
    let population = unit(record.population_density / POPULATION_SATURATION);
    let proximity = unit(1.0 - record.industrial_proximity / PROXIMITY_RANGE_KM);
    let trend = normalize_trend(trend_slope(&record.trend));

    let total = unit(W_EXCEED * exceed + W_POPULATION * population + W_PROXIMITY * proximity + W_TREND * trend);
    RiskBreakdown { exceed, population, proximity, trend, total }
}

/// Ordinary least-squares slope of `samples` against their index.
/// 0 for fewer than two samples.
pub fn trend_slope(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = samples.iter().sum::<f64>() / n as f64;

    let (num, den) = samples.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, &y)| {
        let dx = i as f64 - x_mean;
        (num + dx * (y - y_mean), den + dx * dx)
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Map a slope onto [0, 1]: −0.01 → 0, flat → 0.5, +0.01 → 1.
pub fn normalize_trend(slope: f64) -> f64 {
    unit((slope / TREND_SLOPE_SCALE + 1.0) / 2.0)
}

/// Names of the metals over their limit, in name order.
pub fn exceeding_metals(record: &CellRecord) -> Vec<&str> {
    record
        .metals
        .keys()
        .filter(|m| record.exceeds(m))
        .map(String::as_str)
        .collect()
}

/// Clamp to [0, 1]; NaN collapses to 0.
fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

// ── Tiers ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn from_risk(risk: f64) -> Self {
        if risk >= HOTSPOT_THRESHOLD {
            RiskTier::High
        } else if risk >= MODERATE_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    pub fn color(self) -> Color {
        match self {
            RiskTier::High => RED,
            RiskTier::Moderate => AMBER,
            RiskTier::Low => EMERALD,
        }
    }
}

/// Base-layer fill colour for a risk value.
pub fn metal_palette(risk: f64) -> Color {
    RiskTier::from_risk(risk).color()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hotspot_candidate(density: f64) -> CellRecord {
        let mut rec = CellRecord::new("h", 20.0, 78.0).with_metal("As", 0.06, 0.05);
        rec.population_density = density;
        rec.industrial_proximity = 35.0;
        rec
    }

    #[test]
    fn slope_of_linear_series() {
        let samples: Vec<f64> = (0..10).map(|i| 0.5 + 0.003 * i as f64).collect();
        assert_abs_diff_eq!(trend_slope(&samples), 0.003, epsilon = 1e-12);
        assert_eq!(trend_slope(&[]), 0.0);
        assert_eq!(trend_slope(&[4.0]), 0.0);
    }

    #[test]
    fn trend_normalisation_saturates() {
        assert_eq!(normalize_trend(0.0), 0.5);
        assert_eq!(normalize_trend(0.01), 1.0);
        assert_eq!(normalize_trend(-0.05), 0.0);
        assert_eq!(normalize_trend(f64::NAN), 0.0);
    }

    #[test]
    fn degenerate_record_scores_in_unit_range() {
        let bare = CellRecord::new("x", 20.0, 78.0);
        let b = risk_breakdown(&bare);
        assert_eq!(b.exceed, 0.0);
        // 0 km from industry and a flat trend.
        assert_abs_diff_eq!(b.total, 0.15 + 0.075, epsilon = 1e-12);

        let mut wild = bare.clone();
        wild.population_density = f64::NAN;
        wild.industrial_proximity = -1e9;
        wild.trend = vec![f64::INFINITY, 0.0];
        let r = compute_risk(&wild);
        assert!((0.0..=1.0).contains(&r), "risk {r} out of range");
    }

    #[test]
    fn weights_combine_exactly() {
        let mut rec = CellRecord::new("w", 20.0, 78.0)
            .with_metal("As", 0.06, 0.05)
            .with_metal("Pb", 0.001, 0.01);
        rec.population_density = 12_500.0;
        rec.industrial_proximity = 25.0;
        rec.trend = vec![0.0, 0.01];

        let b = risk_breakdown(&rec);
        assert_abs_diff_eq!(b.exceed, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(b.population, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(b.proximity, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(b.trend, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.total, 0.25 + 0.1 + 0.075 + 0.15, epsilon = 1e-12);
    }

    #[test]
    fn pushing_a_metal_over_its_limit_never_lowers_risk() {
        let base = CellRecord::new("m", 20.0, 78.0)
            .with_metal("As", 0.01, 0.05)
            .with_metal("Pb", 0.2, 0.01)
            .with_metal("Cr", 0.0, 0.05);
        let mut previous = compute_risk(&base);
        for step in 1..=20 {
            let mut overrides = BTreeMap::new();
            overrides.insert("As".to_string(), 0.01 + 0.005 * step as f64);
            let r = compute_risk_with_overrides(&base, &overrides);
            assert!(r >= previous, "step {step}: {r} < {previous}");
            previous = r;
        }
    }

    #[test]
    fn hotspot_boundary_is_representable() {
        assert_eq!(compute_risk(&hotspot_candidate(5000.0)), HOTSPOT_THRESHOLD);
        assert!(compute_risk(&hotspot_candidate(4987.5)) < HOTSPOT_THRESHOLD);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(metal_palette(0.66), RED);
        assert_eq!(metal_palette(0.659), AMBER);
        assert_eq!(metal_palette(0.33), AMBER);
        assert_eq!(metal_palette(0.0), EMERALD);
    }

    #[test]
    fn exceeding_metals_lists_names() {
        let rec = CellRecord::new("e", 20.0, 78.0)
            .with_metal("As", 0.06, 0.05)
            .with_metal("Pb", 0.001, 0.01)
            .with_metal("Hg", 0.01, 0.006);
        assert_eq!(exceeding_metals(&rec), vec!["As", "Hg"]);
    }
}
