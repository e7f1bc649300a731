//! Browser Storage
//!
//! `KeyValueStorage` on `window.localStorage`. Without a usable storage
//! (private mode, sandboxed frame) values only live for the session.

use structr_model::{KeyValueStorage, MemoryStorage};

pub struct BrowserStorage {
    local: Option<web_sys::Storage>,
    fallback: MemoryStorage,
}

impl BrowserStorage {
    pub fn new() -> Self {
        let local = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if local.is_none() {
            tracing::warn!("localStorage unavailable, UI state will not persist");
        }
        Self {
            local,
            fallback: MemoryStorage::new(),
        }
    }
}

impl KeyValueStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        match &self.local {
            Some(storage) => storage.get_item(key).ok().flatten(),
            None => self.fallback.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match &self.local {
            Some(storage) => {
                if storage.set_item(key, value).is_err() {
                    tracing::warn!(key, "localStorage write failed");
                }
            }
            None => self.fallback.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) {
        match &self.local {
            Some(storage) => {
                let _ = storage.remove_item(key);
            }
            None => self.fallback.remove(key),
        }
    }
}
