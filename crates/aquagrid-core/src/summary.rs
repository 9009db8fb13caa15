//! Headline figures for the dashboard cards and the region comparison.
//!
//! Population figures are rough proxies: a 3 × 3 km cell is 9 km², and only a
//! tenth of its residents are counted as exposed.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::Subset;
use crate::record::CellRecord;
use crate::risk::compute_risk;

const CELL_AREA_KM2: f64 = 9.0;
const EXPOSED_SHARE: f64 = 0.1;
const TOP_N: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub records: usize,
    /// Records carrying the exceedance flag.
    pub exceeding: usize,
    pub affected_population: u64,
    /// Metals most often over their limit. Every measured metal is ranked, so
    /// metals never over it fill the list when fewer than three exceed.
    pub top_metals: Vec<String>,
    /// States ranked by their single riskiest cell.
    pub top_states: Vec<String>,
}

impl DashboardSummary {
    pub fn from_records(records: &[CellRecord]) -> Self {
        summarize(records.iter().map(|r| (r, compute_risk(r))))
    }

    /// Reuses the scores already held by `subset`.
    pub fn from_subset(records: &[CellRecord], subset: &Subset) -> Self {
        summarize(subset.iter().filter_map(|e| records.get(e.index).map(|r| (r, e.risk))))
    }
}

fn summarize<'a>(scored: impl Iterator<Item = (&'a CellRecord, f64)>) -> DashboardSummary {
    let mut out = DashboardSummary::default();
    let mut density = 0.0;
    let mut metal_hits: BTreeMap<&str, usize> = BTreeMap::new();
    let mut state_risk: BTreeMap<&str, f64> = BTreeMap::new();

    for (record, risk) in scored {
        out.records += 1;
        if record.exceedance_flag {
            out.exceeding += 1;
        }
        density += record.population_density;
        for metal in record.metals.keys() {
            *metal_hits.entry(metal.as_str()).or_default() += usize::from(record.exceeds(metal));
        }
        let worst = state_risk.entry(record.state.as_str()).or_insert(0.0);
        *worst = worst.max(risk);
    }

    out.affected_population = (density * CELL_AREA_KM2 * EXPOSED_SHARE).round().max(0.0) as u64;
    out.top_metals = top_by(metal_hits, |a, b| b.cmp(a));
    out.top_states = top_by(state_risk, |a, b| b.total_cmp(a));
    out
}

/// Keys of the `TOP_N` best entries; ties keep name order.
fn top_by<V: Copy>(entries: BTreeMap<&str, V>, cmp: impl Fn(&V, &V) -> std::cmp::Ordering) -> Vec<String> {
    let mut ranked: Vec<(&str, V)> = entries.into_iter().collect();
    ranked.sort_by(|a, b| cmp(&a.1, &b.1));
    ranked.into_iter().take(TOP_N).map(|(k, _)| k.to_string()).collect()
}

// ── Region comparison ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub records: usize,
    /// Mean risk, three decimals.
    pub avg_risk: f64,
    /// Share of flagged records in percent, two decimals.
    pub exceed_pct: f64,
    pub population: u64,
}

/// Summary of the records in `state`, or of everything when `None`.
pub fn region_summary(records: &[CellRecord], state: Option<&str>) -> RegionSummary {
    let rows: Vec<&CellRecord> = records
        .iter()
        .filter(|r| state.map_or(true, |s| r.state == s))
        .collect();
    if rows.is_empty() {
        return RegionSummary::default();
    }
    let n = rows.len() as f64;
    let risk_sum: f64 = rows.iter().map(|r| compute_risk(r)).sum();
    let flagged = rows.iter().filter(|r| r.exceedance_flag).count() as f64;
    let density: f64 = rows.iter().map(|r| r.population_density).sum();

    RegionSummary {
        records: rows.len(),
        avg_risk: round_to(risk_sum / n, 3),
        exceed_pct: round_to(flagged * 100.0 / n, 2),
        population: (density * CELL_AREA_KM2 * EXPOSED_SHARE).round().max(0.0) as u64,
    }
}

/// Side-by-side summaries of two regions.
pub fn compare_regions(records: &[CellRecord], a: Option<&str>, b: Option<&str>) -> (RegionSummary, RegionSummary) {
    (region_summary(records, a), region_summary(records, b))
}

fn round_to(x: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (x * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_subset, FilterSpec};
    use approx::assert_abs_diff_eq;

    fn sample() -> Vec<CellRecord> {
        let mut a = CellRecord::new("a", 26.9, 75.8)
            .with_metal("As", 0.06, 0.05)
            .with_metal("Pb", 0.02, 0.01);
        a.state = "Rajasthan".into();
        a.population_density = 1000.0;
        a.exceedance_flag = true;

        let mut b = CellRecord::new("b", 22.5, 88.3).with_metal("As", 0.07, 0.05);
        b.state = "West Bengal".into();
        b.population_density = 20_000.0;
        b.industrial_proximity = 5.0;
        b.exceedance_flag = true;

        let mut c = CellRecord::new("c", 26.0, 75.0).with_metal("Cr", 0.01, 0.05);
        c.state = "Rajasthan".into();
        c.population_density = 500.0;
        c.industrial_proximity = 80.0;

        vec![a, b, c]
    }

    #[test]
    fn dashboard_counts_and_rankings() {
        let s = DashboardSummary::from_records(&sample());
        assert_eq!(s.records, 3);
        assert_eq!(s.exceeding, 2);
        // (1000 + 20000 + 500) × 9 × 0.1
        assert_eq!(s.affected_population, 19_350);
        assert_eq!(s.top_metals, vec!["As".to_string(), "Pb".to_string(), "Cr".to_string()]);
        assert_eq!(s.top_states, vec!["West Bengal".to_string(), "Rajasthan".to_string()]);
    }

    #[test]
    fn metals_never_exceeding_still_rank_by_name() {
        let a = CellRecord::new("a", 20.0, 78.0).with_metal("Zn", 0.01, 3.0).with_metal("Cd", 0.001, 0.003);
        let b = CellRecord::new("b", 20.1, 78.0).with_metal("Hg", 0.01, 0.006).with_metal("Fe", 0.1, 0.3);
        let s = DashboardSummary::from_records(&[a, b]);
        assert_eq!(s.top_metals, vec!["Hg".to_string(), "Cd".to_string(), "Fe".to_string()]);
    }

    #[test]
    fn subset_summary_matches_recomputed_one() {
        let records = sample();
        let subset = filter_subset(&records, &FilterSpec::default());
        assert_eq!(DashboardSummary::from_subset(&records, &subset), DashboardSummary::from_records(&records));
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(DashboardSummary::from_records(&[]), DashboardSummary::default());
        assert_eq!(region_summary(&[], Some("Goa")), RegionSummary::default());
    }

    #[test]
    fn region_rounding() {
        let records = sample();
        let (raj, all) = compare_regions(&records, Some("Rajasthan"), None);
        assert_eq!(raj.records, 2);
        assert_eq!(raj.exceed_pct, 50.0);
        assert_eq!(raj.population, 1_350);
        assert_eq!(all.exceed_pct, 66.67);

        let expected = (compute_risk(&records[0]) + compute_risk(&records[2])) / 2.0;
        assert_abs_diff_eq!(raj.avg_risk, expected, epsilon = 5e-4);
        assert_eq!(raj.avg_risk, round_to(raj.avg_risk, 3));
    }
}
