//! Cell records and permissive ingestion.
//!
//! Input rows are best-effort synthetic data, so ingestion never rejects a
//! record: coordinates are defaulted and clamped into the grid extent,
//! missing numbers become 0, missing maps become empty. Only JSON that does
//! not parse at all is an error.
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coords::{LatLon, DEFAULT_CENTER, INDIA_BOUNDS};
use crate::error::IngestError;
use crate::geometry::{rectangle_for_cell, Ring};

// ── Land use ─────────────────────────────────────────────────────────────────

/// Dominant land use of a cell; unknown labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LandUse {
    Agri,
    Industrial,
    Urban,
    Mixed,
    Forest,
    Other(String),
}

impl LandUse {
    pub fn as_str(&self) -> &str {
        match self {
            LandUse::Agri => "Agri",
            LandUse::Industrial => "Industrial",
            LandUse::Urban => "Urban",
            LandUse::Mixed => "Mixed",
            LandUse::Forest => "Forest",
            LandUse::Other(s) => s,
        }
    }
}

impl From<String> for LandUse {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Agri" => LandUse::Agri,
            "Industrial" => LandUse::Industrial,
            "Urban" => LandUse::Urban,
            "Mixed" => LandUse::Mixed,
            "Forest" => LandUse::Forest,
            _ => LandUse::Other(s),
        }
    }
}

impl From<&str> for LandUse {
    fn from(s: &str) -> Self {
        LandUse::from(s.to_string())
    }
}

impl From<LandUse> for String {
    fn from(lu: LandUse) -> Self {
        match lu {
            LandUse::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for LandUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Cell record ──────────────────────────────────────────────────────────────

/// One grid cell. Immutable once loaded; derived values are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    #[serde(rename = "Raster_ID")]
    pub id: String,
    #[serde(rename = "Lat_Center")]
    pub lat: f64,
    #[serde(rename = "Lon_Center")]
    pub lon: f64,
    #[serde(rename = "Region_State")]
    pub state: String,
    #[serde(rename = "Region_District")]
    pub district: String,
    /// People per km².
    #[serde(rename = "Population_Density")]
    pub population_density: f64,
    #[serde(rename = "Land_Use_Type")]
    pub land_use: LandUse,
    #[serde(rename = "Water_Source_Count")]
    pub water_source_count: f64,
    #[serde(rename = "Sampling_Frequency")]
    pub sampling_frequency: f64,
    /// Metal name → concentration (mg/L), non-negative.
    #[serde(rename = "Heavy_Metals")]
    pub metals: BTreeMap<String, f64>,
    /// Metal name → regulatory limit (mg/L). Absent means no limit.
    #[serde(rename = "WHO_Limit")]
    pub limits: BTreeMap<String, f64>,
    /// Chronological concentration samples.
    #[serde(rename = "Trend_Data")]
    pub trend: Vec<f64>,
    #[serde(rename = "Exceedance_Flag")]
    pub exceedance_flag: bool,
    /// 0-1.
    #[serde(rename = "Health_Risk_Score")]
    pub health_risk_score: f64,
    /// Distance to the nearest industrial site, km.
    #[serde(rename = "Industrial_Proximity")]
    pub industrial_proximity: f64,
    #[serde(rename = "Mining_Proximity")]
    pub mining_proximity: f64,
    #[serde(rename = "Agriculture_Proximity")]
    pub agriculture_proximity: f64,
    /// Mean annual rainfall, mm/yr.
    #[serde(rename = "Rainfall")]
    pub rainfall: f64,
    /// Depth to groundwater, m.
    #[serde(rename = "Groundwater_Depth")]
    pub groundwater_depth: f64,
    #[serde(rename = "Recharge_Rate")]
    pub recharge_rate: f64,
    #[serde(rename = "Urbanization_Index")]
    pub urbanization_index: f64,
}

impl CellRecord {
    /// A record at (`lat`, `lon`) with every other field at its ingestion default.
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            state: UNKNOWN.to_string(),
            district: UNKNOWN.to_string(),
            population_density: 0.0,
            land_use: LandUse::Mixed,
            water_source_count: 0.0,
            sampling_frequency: 0.0,
            metals: BTreeMap::new(),
            limits: BTreeMap::new(),
            trend: Vec::new(),
            exceedance_flag: false,
            health_risk_score: 0.0,
            industrial_proximity: 0.0,
            mining_proximity: 0.0,
            agriculture_proximity: 0.0,
            rainfall: 0.0,
            groundwater_depth: 0.0,
            recharge_rate: 0.0,
            urbanization_index: 0.0,
        }
    }

    /// Add a metal reading and its limit.
    pub fn with_metal(mut self, metal: &str, concentration: f64, limit: f64) -> Self {
        self.metals.insert(metal.to_string(), concentration);
        self.limits.insert(metal.to_string(), limit);
        self
    }

    pub fn location(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    /// Regulatory limit for `metal`; +∞ when none is recorded.
    pub fn limit(&self, metal: &str) -> f64 {
        self.limits.get(metal).copied().unwrap_or(f64::INFINITY)
    }

    pub fn exceeds(&self, metal: &str) -> bool {
        self.metals.get(metal).is_some_and(|&v| v > self.limit(metal))
    }

    pub fn any_exceedance(&self) -> bool {
        self.metals.keys().any(|m| self.exceeds(m))
    }

    pub fn ring(&self) -> Ring {
        rectangle_for_cell(self.lat, self.lon)
    }
}

// ── Dataset ──────────────────────────────────────────────────────────────────

/// The session's record collection. Indices into it are stable for its lifetime.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<CellRecord>,
}

impl Dataset {
    pub fn new(records: Vec<CellRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CellRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

// ── Ingestion ────────────────────────────────────────────────────────────────

const UNKNOWN: &str = "Unknown";

/// Parse a record collection. The top level may be an array, or an object
/// holding the array under `records`, `data` or `rasters`.
pub fn records_from_json(text: &str) -> Result<Vec<CellRecord>, IngestError> {
    let root: Value = serde_json::from_str(text)?;
    Ok(records_from_value(&root))
}

pub fn records_from_value(root: &Value) -> Vec<CellRecord> {
    let rows = record_rows(root);
    let mut sanitizer = Sanitizer::default();
    let records: Vec<CellRecord> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| sanitizer.record(row, i))
        .collect();

    if sanitizer.coords_fixed > 0 || sanitizer.entries_dropped > 0 {
        warn!(
            "sanitized {} records: {} coordinate fixes, {} unusable map entries dropped",
            records.len(),
            sanitizer.coords_fixed,
            sanitizer.entries_dropped
        );
    }
    info!("ingested {} cell records", records.len());
    records
}

/// Sanitize a single raw row. `index` names rows that carry no ID.
pub fn sanitize_record(raw: &Value, index: usize) -> CellRecord {
    Sanitizer::default().record(raw, index)
}

fn record_rows(root: &Value) -> &[Value] {
    if let Value::Array(rows) = root {
        return rows;
    }
    for key in ["records", "data", "rasters"] {
        if let Some(Value::Array(rows)) = root.get(key) {
            return rows;
        }
    }
    debug!("record source has no recognised array; treating as empty");
    &[]
}

#[derive(Default)]
struct Sanitizer {
    coords_fixed: usize,
    entries_dropped: usize,
}

impl Sanitizer {
    fn record(&mut self, raw: &Value, index: usize) -> CellRecord {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);
        let field = |key: &str| obj.get(key);

        let raw_lat = number(field("Lat_Center"));
        let raw_lon = number(field("Lon_Center"));
        let unclamped = LatLon::new(
            raw_lat.unwrap_or(DEFAULT_CENTER.lat),
            raw_lon.unwrap_or(DEFAULT_CENTER.lon),
        );
        let location = INDIA_BOUNDS.clamp(unclamped);
        if raw_lat.is_none() || raw_lon.is_none() || location != unclamped {
            self.coords_fixed += 1;
        }

        let metals = self.number_map(field("Heavy_Metals"), true);
        let limits = self.number_map(field("WHO_Limit").or_else(|| field("WHO_Limits")), false);
        let trend = self.number_list(field("Trend_Data"));

        CellRecord {
            id: text(field("Raster_ID")).unwrap_or_else(|| format!("R-{index}")),
            lat: location.lat,
            lon: location.lon,
            state: text(field("Region_State").or_else(|| field("State")))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            district: text(field("Region_District").or_else(|| field("District")))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            population_density: number_or_zero(field("Population_Density")),
            land_use: text(field("Land_Use_Type")).map(LandUse::from).unwrap_or(LandUse::Mixed),
            water_source_count: number_or_zero(field("Water_Source_Count")),
            sampling_frequency: number_or_zero(field("Sampling_Frequency")),
            metals,
            limits,
            trend,
            exceedance_flag: flag(field("Exceedance_Flag")),
            health_risk_score: number_or_zero(field("Health_Risk_Score")).clamp(0.0, 1.0),
            industrial_proximity: number_or_zero(field("Industrial_Proximity")),
            mining_proximity: number_or_zero(field("Mining_Proximity")),
            agriculture_proximity: number_or_zero(
                field("Agriculture_Proximity").or_else(|| field("Agricultural_Proximity")),
            ),
            rainfall: number_or_zero(field("Rainfall")),
            groundwater_depth: number_or_zero(field("Groundwater_Depth")),
            recharge_rate: number_or_zero(field("Recharge_Rate")),
            urbanization_index: number_or_zero(field("Urbanization_Index")),
        }
    }

    fn number_map(&mut self, v: Option<&Value>, non_negative: bool) -> BTreeMap<String, f64> {
        let Some(Value::Object(entries)) = v else {
            return BTreeMap::new();
        };
        let mut out = BTreeMap::new();
        for (name, value) in entries {
            match number(Some(value)) {
                Some(x) if non_negative => {
                    out.insert(name.clone(), x.max(0.0));
                }
                Some(x) => {
                    out.insert(name.clone(), x);
                }
                None => self.entries_dropped += 1,
            }
        }
        out
    }

    fn number_list(&mut self, v: Option<&Value>) -> Vec<f64> {
        let Some(Value::Array(items)) = v else {
            return Vec::new();
        };
        let out: Vec<f64> = items.iter().filter_map(|x| number(Some(x))).collect();
        self.entries_dropped += items.len() - out.len();
        out
    }
}

/// Finite number from a JSON number or numeric string.
fn number(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    x.is_finite().then_some(x)
}

fn number_or_zero(v: Option<&Value>) -> f64 {
    number(v).unwrap_or(0.0)
}

fn text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_clamps_and_defaults() {
        let raw = json!({
            "Raster_ID": "IN-0001",
            "Lat_Center": 52.0,
            "Lon_Center": "60.5",
            "Heavy_Metals": { "As": 0.02, "Pb": "n/a", "Cd": -1.0 },
            "WHO_Limit": { "As": 0.01 },
            "Trend_Data": [0.01, "x", 0.02],
        });
        let rec = sanitize_record(&raw, 0);

        assert_eq!(rec.id, "IN-0001");
        assert_eq!(rec.lat, INDIA_BOUNDS.max_lat);
        assert_eq!(rec.lon, INDIA_BOUNDS.min_lon);
        assert_eq!(rec.metals.len(), 2, "non-numeric Pb must be dropped");
        assert_eq!(rec.metals["Cd"], 0.0);
        assert_eq!(rec.trend, vec![0.01, 0.02]);
        assert_eq!(rec.state, "Unknown");
        assert_eq!(rec.land_use, LandUse::Mixed);
        assert_eq!(rec.population_density, 0.0);
    }

    #[test]
    fn sanitize_garbage_row_is_usable() {
        let rec = sanitize_record(&json!("not an object"), 7);
        assert_eq!(rec.id, "R-7");
        assert_eq!(rec.location(), DEFAULT_CENTER);
        assert!(rec.metals.is_empty() && rec.limits.is_empty() && rec.trend.is_empty());
    }

    #[test]
    fn wrapped_collections_are_unwrapped() {
        for key in ["records", "data", "rasters"] {
            let text = format!(r#"{{"{key}": [{{"Raster_ID": "a"}}, {{"Raster_ID": "b"}}]}}"#);
            let records = records_from_json(&text).unwrap();
            assert_eq!(records.len(), 2, "key {key}");
        }
        assert!(records_from_json(r#"{"other": []}"#).unwrap().is_empty());
    }

    #[test]
    fn unparseable_text_is_an_error() {
        assert!(records_from_json("[{").is_err());
    }

    #[test]
    fn missing_limit_never_exceeds() {
        let mut rec = CellRecord::new("a", 20.0, 78.0);
        rec.metals.insert("As".into(), 1e9);
        assert!(!rec.exceeds("As"));
        assert!(!rec.any_exceedance());

        let rec = rec.with_metal("Pb", 0.02, 0.01);
        assert!(rec.exceeds("Pb"));
        assert!(rec.any_exceedance());
    }

    #[test]
    fn land_use_round_trips_through_strings() {
        assert_eq!(LandUse::from("Urban"), LandUse::Urban);
        assert_eq!(LandUse::from("Wetland"), LandUse::Other("Wetland".into()));
        assert_eq!(String::from(LandUse::Other("Wetland".into())), "Wetland");
        let json = serde_json::to_string(&LandUse::Industrial).unwrap();
        assert_eq!(json, "\"Industrial\"");
    }

    #[test]
    fn dataset_finds_records_by_id() {
        let ds = Dataset::new(vec![CellRecord::new("a", 20.0, 78.0), CellRecord::new("b", 21.0, 79.0)]);
        assert_eq!(ds.position("b"), Some(1));
        assert_eq!(ds.position("zz"), None);
        assert_eq!(ds.len(), 2);
    }
}
