//! Bookmarked record IDs behind an injected key-value store.
use std::collections::HashMap;

use log::warn;

use crate::error::StoreError;

/// Key under which the bookmark list is stored.
pub const BOOKMARKS_KEY: &str = "bookmarks";

/// String key-value persistence (browser `localStorage`, a file, memory).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Ordered set of bookmarked record IDs, stored as a JSON array.
pub struct Bookmarks {
    store: Box<dyn KeyValueStore>,
}

impl Bookmarks {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Bookmarked IDs in the order they were added. Unreadable data reads as
    /// no bookmarks.
    pub fn list(&self) -> Vec<String> {
        let Some(raw) = self.store.get(BOOKMARKS_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("ignoring unreadable bookmark list: {e}");
            Vec::new()
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.list().iter().any(|b| b == id)
    }

    /// Add or remove `id`; returns whether it is bookmarked afterwards.
    pub fn toggle(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut ids = self.list();
        let on = match ids.iter().position(|b| b == id) {
            Some(pos) => {
                ids.remove(pos);
                false
            }
            None => {
                ids.push(id.to_string());
                true
            }
        };
        self.store.set(BOOKMARKS_KEY, &serde_json::to_string(&ids)?)?;
        Ok(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_round_trips_through_the_store() {
        let mut b = Bookmarks::new(Box::new(MemoryStore::new()));
        assert!(b.list().is_empty());
        assert!(b.toggle("R-1").unwrap());
        assert!(b.toggle("R-7").unwrap());
        assert!(b.contains("R-1"));
        assert!(!b.toggle("R-1").unwrap());
        assert_eq!(b.list(), vec!["R-7".to_string()]);
    }

    #[test]
    fn corrupt_value_reads_as_empty_and_is_overwritten() {
        let mut store = MemoryStore::new();
        store.set(BOOKMARKS_KEY, "{not json").unwrap();
        let mut b = Bookmarks::new(Box::new(store));
        assert!(!b.contains("x"));
        assert!(b.toggle("x").unwrap());
        assert_eq!(b.list(), vec!["x".to_string()]);
    }

    #[test]
    fn failing_store_surfaces_the_error() {
        struct ReadOnly;
        impl KeyValueStore for ReadOnly {
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
                Err(StoreError::Backend { message: "quota exceeded".into() })
            }
        }
        let mut b = Bookmarks::new(Box::new(ReadOnly));
        assert!(b.toggle("x").is_err());
    }
}
