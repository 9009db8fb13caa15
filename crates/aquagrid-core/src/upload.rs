//! Well-level measurement uploads and their persistence.
//!
//! Rows come from an uploaded sheet already converted to JSON objects. Each
//! row is keyed by its well code, so uploading the same sheet twice leaves
//! the store unchanged.
use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IngestError, StoreError};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One monitoring well and its dated readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellRow {
    #[serde(rename = "STATE")]
    pub state: String,
    #[serde(rename = "DISTRICT")]
    pub district: String,
    #[serde(rename = "LAT")]
    pub lat: f64,
    #[serde(rename = "LON")]
    pub lon: f64,
    #[serde(rename = "SITE_TYPE")]
    pub site_type: String,
    /// Unique well code.
    #[serde(rename = "WLCODE")]
    pub code: String,
    /// Column name (a season/year label) → reading; `None` for "NA".
    pub measurements: BTreeMap<String, Option<f64>>,
}

impl WellRow {
    /// Build from one sheet row. Any column whose name contains "19" or "20"
    /// is a measurement.
    pub fn from_value(raw: &Value) -> Self {
        let empty = serde_json::Map::new();
        let obj = raw.as_object().unwrap_or(&empty);
        let text = |key: &str| match obj.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let coord = |key: &str| reading(obj.get(key)).unwrap_or(0.0);

        let measurements = obj
            .iter()
            .filter(|(k, _)| k.contains("19") || k.contains("20"))
            .map(|(k, v)| (k.clone(), reading(Some(v))))
            .collect();

        Self {
            state: text("STATE"),
            district: text("DISTRICT"),
            lat: coord("LAT"),
            lon: coord("LON"),
            site_type: text("SITE_TYPE"),
            code: text("WLCODE"),
            measurements,
        }
    }
}

fn reading(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim() == "NA" => None,
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    x.is_finite().then_some(x)
}

/// Parse an uploaded sheet: a JSON array of row objects.
pub fn rows_from_json(text: &str) -> Result<Vec<WellRow>, IngestError> {
    let root: Value = serde_json::from_str(text)?;
    let rows = match root {
        Value::Array(rows) => rows.iter().map(WellRow::from_value).collect(),
        _ => {
            warn!("upload is not a JSON array; nothing to persist");
            Vec::new()
        }
    };
    Ok(rows)
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Outcome of one upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    /// New documents.
    pub upserted: usize,
    /// Existing documents whose content changed.
    pub modified: usize,
    /// Existing documents already identical.
    pub unchanged: usize,
}

impl std::ops::AddAssign for UpsertCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.upserted += rhs.upserted;
        self.modified += rhs.modified;
        self.unchanged += rhs.unchanged;
    }
}

/// A document store that upserts wells by code.
pub trait DocumentStore {
    /// Insert or replace each document by its code. A document without a
    /// code fails the batch with [`StoreError::MissingCode`].
    fn bulk_upsert(&mut self, docs: &[WellRow]) -> Result<UpsertCounts, StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistReport {
    pub batches: usize,
    pub counts: UpsertCounts,
    /// Rows without a well code, not sent to the store.
    pub skipped: usize,
}

impl PersistReport {
    /// Documents written (inserted or changed).
    pub fn written(&self) -> usize {
        self.counts.upserted + self.counts.modified
    }
}

/// Upsert `rows` in batches of `batch_size`; rows without a code are skipped.
pub fn persist_rows<S: DocumentStore + ?Sized>(
    store: &mut S,
    rows: &[WellRow],
    batch_size: usize,
) -> Result<PersistReport, StoreError> {
    let (keyed, blank): (Vec<&WellRow>, Vec<&WellRow>) = rows.iter().partition(|r| !r.code.is_empty());
    let mut report = PersistReport { skipped: blank.len(), ..PersistReport::default() };
    if report.skipped > 0 {
        warn!("{} uploaded rows have no WLCODE and were skipped", report.skipped);
    }

    let batch_size = batch_size.max(1);
    let total = keyed.len().div_ceil(batch_size);
    for (i, chunk) in keyed.chunks(batch_size).enumerate() {
        let docs: Vec<WellRow> = chunk.iter().map(|r| (*r).clone()).collect();
        report.counts += store.bulk_upsert(&docs)?;
        report.batches += 1;
        info!("persisted batch {}/{} ({} rows)", i + 1, total, docs.len());
    }
    Ok(report)
}

/// In-memory store keyed by well code.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    docs: BTreeMap<String, WellRow>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: impl IntoIterator<Item = WellRow>) -> Self {
        Self { docs: docs.into_iter().map(|d| (d.code.clone(), d)).collect() }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&WellRow> {
        self.docs.get(code)
    }

    /// Documents in code order.
    pub fn documents(&self) -> impl Iterator<Item = &WellRow> {
        self.docs.values()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn bulk_upsert(&mut self, docs: &[WellRow]) -> Result<UpsertCounts, StoreError> {
        if docs.iter().any(|d| d.code.is_empty()) {
            return Err(StoreError::MissingCode);
        }
        let mut counts = UpsertCounts::default();
        for doc in docs {
            match self.docs.get(&doc.code) {
                None => counts.upserted += 1,
                Some(existing) if existing == doc => counts.unchanged += 1,
                Some(_) => counts.modified += 1,
            }
            self.docs.insert(doc.code.clone(), doc.clone());
        }
        Ok(counts)
    }
}
