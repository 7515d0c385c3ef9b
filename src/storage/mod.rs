//! Durable storage media.
//!
//! A storage medium is a synchronous, string-keyed, string-valued store that
//! outlives a single session. Persistent state encodes values to JSON text
//! before handing them to the medium, so implementations never see `T`.
//!
//! - [`MemoryStorage`] - in-process map, records calls (test double)
//! - [`FileStorage`] - JSON file on disk, survives process restarts
//! - `WebStorage` - browser `localStorage` (`web` feature, wasm32 only)

mod file;
mod memory;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web;

pub use file::FileStorage;
pub use memory::{MemoryStorage, StorageCalls};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::WebStorage;

use crate::error::Result;

/// A synchronous key-value text store.
///
/// Mirrors the `getItem` / `setItem` / `removeItem` surface of browser
/// storage. Implementations must be usable from any thread.
pub trait StorageMedium: Send + Sync {
    /// Read the text stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any previous entry.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the entry for `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Delete every entry.
    fn clear(&self) -> Result<()>;
}
