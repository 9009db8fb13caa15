//! Declarative record filtering.
//!
//! A [`FilterSpec`] is replaced wholesale, never edited in place. A pass keeps
//! input order, ANDs every predicate, and scores each surviving record once;
//! the score travels with the result so the renderer does not recompute it.
//!
//! Hotspot mode is separate from the spec: it trims a finished pass down to
//! its highest-risk [`HOTSPOT_SHARE`].
use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::record::{CellRecord, LandUse};
use crate::risk::{compute_risk, HOTSPOT_THRESHOLD};

/// Default number of hits returned by [`search`].
pub const SEARCH_LIMIT: usize = 12;

/// Fraction of the filtered records kept in hotspot mode, rounded up.
pub const HOTSPOT_SHARE: f64 = 0.05;

// ── Specification ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    /// Exact state name.
    pub state: Option<String>,
    /// Exact district name.
    pub district: Option<String>,
    /// Keep records measuring any of these metals. Empty = no constraint.
    pub metals: BTreeSet<String>,
    /// Inclusive [lo, hi] on the composite risk.
    pub risk_range: [f64; 2],
    /// Keep records with at least one metal over its limit.
    pub exceed_only: bool,
    /// Keep records at or above the hotspot threshold.
    pub hotspots_only: bool,
    /// Empty = no constraint.
    pub land_uses: BTreeSet<LandUse>,
    /// Inclusive groundwater depth window, metres.
    pub depth_range: Option<[f64; 2]>,
    /// Case-insensitive substring over ID, state, district and metal names.
    pub query: Option<String>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            state: None,
            district: None,
            metals: BTreeSet::new(),
            risk_range: [0.0, 1.0],
            exceed_only: false,
            hotspots_only: false,
            land_uses: BTreeSet::new(),
            depth_range: None,
            query: None,
        }
    }
}

impl FilterSpec {
    /// Evaluate every predicate against `record`. `risk` caches the score for
    /// this pass; it is filled on first use.
    fn admits(&self, record: &CellRecord, risk: &mut Option<f64>) -> bool {
        if self.state.as_ref().is_some_and(|s| *s != record.state) {
            return false;
        }
        if self.district.as_ref().is_some_and(|d| *d != record.district) {
            return false;
        }
        if !self.metals.is_empty() && !self.metals.iter().any(|m| record.metals.contains_key(m)) {
            return false;
        }
        if self.exceed_only && !record.any_exceedance() {
            return false;
        }
        if !self.land_uses.is_empty() && !self.land_uses.contains(&record.land_use) {
            return false;
        }
        if let Some([lo, hi]) = self.depth_range {
            if record.groundwater_depth < lo || record.groundwater_depth > hi {
                return false;
            }
        }
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            if !matches_query(record, &q.to_lowercase(), true) {
                return false;
            }
        }

        let r = *risk.get_or_insert_with(|| compute_risk(record));
        if self.hotspots_only && r < HOTSPOT_THRESHOLD {
            return false;
        }
        let [lo, hi] = self.risk_range;
        r >= lo && r <= hi
    }
}

// ── Subset ───────────────────────────────────────────────────────────────────

/// A surviving record: its position in the source collection and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsetEntry {
    pub index: usize,
    pub risk: f64,
}

/// Ordered result of a filter pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subset {
    entries: Vec<SubsetEntry>,
}

impl Subset {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SubsetEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubsetEntry> {
        self.entries.iter()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.iter().any(|e| e.index == index)
    }

    /// The highest-risk `ceil(len * share)` entries, still in source order.
    /// Equal scores keep the earlier record. `share` is clamped to 0..=1.
    pub fn top_share(&self, share: f64) -> Subset {
        let share = if share.is_nan() { 0.0 } else { share.clamp(0.0, 1.0) };
        let keep = (self.entries.len() as f64 * share).ceil() as usize;
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.risk.total_cmp(&a.risk).then(a.index.cmp(&b.index)));
        ranked.truncate(keep);
        ranked.sort_by_key(|e| e.index);
        Subset { entries: ranked }
    }

    /// Resolve against the collection the subset was computed from.
    pub fn records<'a>(&'a self, records: &'a [CellRecord]) -> impl Iterator<Item = &'a CellRecord> + 'a {
        self.entries.iter().filter_map(move |e| records.get(e.index))
    }
}

/// One filter pass over `records`.
pub fn filter_subset(records: &[CellRecord], spec: &FilterSpec) -> Subset {
    let entries: Vec<SubsetEntry> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let mut risk = None;
            if spec.admits(record, &mut risk) {
                risk.map(|risk| SubsetEntry { index, risk })
            } else {
                None
            }
        })
        .collect();
    debug!("filter pass: {} of {} records kept", entries.len(), records.len());
    Subset { entries }
}

/// Owned, order-preserving filtered copy of `records`.
pub fn apply_filters(records: &[CellRecord], spec: &FilterSpec) -> Vec<CellRecord> {
    filter_subset(records, spec).records(records).cloned().collect()
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Holds the current spec and its derived subset. The subset is recomputed
/// only when the spec, the hotspot mode or the records change, so it can be
/// used as a cache key.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    spec: FilterSpec,
    hotspot_mode: bool,
    subset: Subset,
    generation: u64,
}

impl FilterEngine {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec, hotspot_mode: false, subset: Subset::default(), generation: 0 }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn hotspot_mode(&self) -> bool {
        self.hotspot_mode
    }

    pub fn subset(&self) -> &Subset {
        &self.subset
    }

    /// Bumped on every recomputation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Recompute against a new record collection under the current spec.
    pub fn rebuild(&mut self, records: &[CellRecord]) {
        let subset = filter_subset(records, &self.spec);
        self.subset = if self.hotspot_mode {
            let top = subset.top_share(HOTSPOT_SHARE);
            debug!("hotspot mode: {} of {} filtered records kept", top.len(), subset.len());
            top
        } else {
            subset
        };
        self.generation += 1;
    }

    /// Replace the spec. Returns `false`, keeping the existing subset, when
    /// the new spec equals the current one.
    pub fn set_spec(&mut self, records: &[CellRecord], spec: FilterSpec) -> bool {
        if spec == self.spec && self.generation > 0 {
            return false;
        }
        self.spec = spec;
        self.rebuild(records);
        true
    }

    /// Switch hotspot mode. Returns `false` when it is already in that state.
    pub fn set_hotspot_mode(&mut self, records: &[CellRecord], on: bool) -> bool {
        if on == self.hotspot_mode && self.generation > 0 {
            return false;
        }
        self.hotspot_mode = on;
        self.rebuild(records);
        true
    }
}

// ── Facets & search ──────────────────────────────────────────────────────────

pub fn unique_states(records: &[CellRecord]) -> Vec<String> {
    collect_sorted(records.iter().map(|r| r.state.clone()))
}

/// Districts, optionally restricted to one state.
pub fn unique_districts(records: &[CellRecord], state: Option<&str>) -> Vec<String> {
    collect_sorted(
        records
            .iter()
            .filter(|r| state.map_or(true, |s| r.state == s))
            .map(|r| r.district.clone()),
    )
}

pub fn unique_metals(records: &[CellRecord]) -> Vec<String> {
    collect_sorted(records.iter().flat_map(|r| r.metals.keys().cloned()))
}

pub fn unique_land_uses(records: &[CellRecord]) -> Vec<LandUse> {
    collect_sorted(records.iter().map(|r| r.land_use.clone()))
}

fn collect_sorted<T: Ord>(items: impl Iterator<Item = T>) -> Vec<T> {
    items.collect::<BTreeSet<_>>().into_iter().collect()
}

/// Global search: indices of the first `limit` records whose state, district
/// or any metal name contains `query` (case-insensitive).
pub fn search(records: &[CellRecord], query: &str, limit: usize) -> Vec<usize> {
    let q = query.trim().to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| matches_query(r, &q, false))
        .map(|(i, _)| i)
        .take(limit)
        .collect()
}

/// `q` must already be lowercase.
fn matches_query(record: &CellRecord, q: &str, include_id: bool) -> bool {
    (include_id && record.id.to_lowercase().contains(q))
        || record.state.to_lowercase().contains(q)
        || record.district.to_lowercase().contains(q)
        || record.metals.keys().any(|m| m.to_lowercase().contains(q))
}
