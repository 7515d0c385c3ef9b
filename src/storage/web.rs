use crate::error::{Result, StateError};
use crate::storage::StorageMedium;

/// Browser `localStorage`.
///
/// Holds no handle: `window.localStorage` is looked up on every call, which
/// keeps the type `Send + Sync` on single-threaded wasm targets.
#[derive(Debug, Clone, Copy)]
pub struct WebStorage {
    _private: (),
}

impl WebStorage {
    /// Returns a handle when `window.localStorage` is reachable.
    ///
    /// Yields `None` outside a window context (workers, server rendering)
    /// or when the browser denies access to storage.
    pub fn detect() -> Option<Self> {
        local_storage().map(|_| Self { _private: () })
    }
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

fn storage() -> Result<web_sys::Storage> {
    local_storage().ok_or_else(|| StateError::Storage("localStorage is unavailable".to_string()))
}

impl StorageMedium for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        storage()?
            .get_item(key)
            .map_err(|err| StateError::Storage(format!("getItem('{key}') failed: {err:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        storage()?
            .set_item(key, value)
            .map_err(|err| StateError::Storage(format!("setItem('{key}') failed: {err:?}")))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        storage()?
            .remove_item(key)
            .map_err(|err| StateError::Storage(format!("removeItem('{key}') failed: {err:?}")))
    }

    fn clear(&self) -> Result<()> {
        storage()?
            .clear()
            .map_err(|err| StateError::Storage(format!("clear() failed: {err:?}")))
    }
}
