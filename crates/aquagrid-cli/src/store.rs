//! JSON-file document store for well uploads.
use std::fs;
use std::path::{Path, PathBuf};

use aquagrid_core::error::StoreError;
use aquagrid_core::upload::{DocumentStore, MemoryDocumentStore, UpsertCounts, WellRow};

/// Holds every well in memory and rewrites the file after each batch.
pub struct JsonFileStore {
    path: PathBuf,
    docs: MemoryDocumentStore,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let docs = if path.exists() {
            let rows: Vec<WellRow> = serde_json::from_str(&fs::read_to_string(&path)?)?;
            MemoryDocumentStore::from_documents(rows)
        } else {
            MemoryDocumentStore::new()
        };
        log::debug!("opened {} with {} wells", path.display(), docs.len());
        Ok(Self { path, docs })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let rows: Vec<&WellRow> = self.docs.documents().collect();
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&rows)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn bulk_upsert(&mut self, docs: &[WellRow]) -> Result<UpsertCounts, StoreError> {
        let counts = self.docs.bulk_upsert(docs)?;
        if counts.upserted + counts.modified > 0 {
            self.flush()?;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquagrid_core::upload::persist_rows;
    use serde_json::json;

    fn rows() -> Vec<WellRow> {
        (0..5)
            .map(|i| {
                WellRow::from_value(&json!({
                    "STATE": "Punjab", "DISTRICT": "Ludhiana", "LAT": 30.9, "LON": 75.8,
                    "SITE_TYPE": "Dug Well", "WLCODE": format!("W{i}"), "MAY_2019": 4.2
                }))
            })
            .collect()
    }

    #[test]
    fn reupload_is_idempotent_across_reopen() {
        let path = std::env::temp_dir().join(format!("aquagrid-store-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        let first = persist_rows(&mut store, &rows(), 2).unwrap();
        assert_eq!(first.written(), 5);
        assert_eq!(first.batches, 3);

        let mut reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 5);
        let second = persist_rows(&mut reopened, &rows(), 2).unwrap();
        assert_eq!(second.written(), 0);
        assert_eq!(second.counts.unchanged, 5);

        fs::remove_file(&path).unwrap();
    }
}
