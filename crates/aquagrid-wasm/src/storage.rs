//! `localStorage`-backed key-value store for bookmarks.
use aquagrid_core::bookmark::KeyValueStore;
use aquagrid_core::error::StoreError;
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// Keys are namespaced so several grids on one origin do not collide.
pub struct LocalStorageStore {
    storage: Storage,
    prefix: String,
}

impl LocalStorageStore {
    pub fn new(storage: Storage, prefix: impl Into<String>) -> Self {
        Self { storage, prefix: prefix.into() }
    }

    /// The window's `localStorage`, or `None` when the browser withholds it
    /// (private mode, sandboxed frames).
    pub fn from_window(window: &web_sys::Window, prefix: impl Into<String>) -> Option<Self> {
        match window.local_storage() {
            Ok(Some(storage)) => Some(Self::new(storage, prefix)),
            Ok(None) => None,
            Err(e) => {
                log::warn!("localStorage unavailable: {e:?}");
                None
            }
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

fn backend(e: JsValue) -> StoreError {
    StoreError::Backend { message: e.as_string().unwrap_or_else(|| format!("{e:?}")) }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(&self.key(key)).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage.set_item(&self.key(key), value).map_err(backend)
    }
}
