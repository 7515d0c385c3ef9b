use crate::error::Result;
use crate::storage::StorageMedium;
use crate::sync::lock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Number of calls made to each [`StorageMedium`] method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageCalls {
    pub get: usize,
    pub set: usize,
    pub remove: usize,
    pub clear: usize,
}

impl StorageCalls {
    /// Total number of calls across all methods.
    pub fn total(&self) -> usize {
        self.get + self.set + self.remove + self.clear
    }
}

/// An in-memory storage medium.
///
/// Useful as a test double: every trait call is counted, and the `raw_*`
/// helpers inspect or plant entries without being counted.
///
/// # Examples
///
/// ```
/// use cubby::storage::{MemoryStorage, StorageMedium};
///
/// let storage = MemoryStorage::new();
/// storage.set_item("greeting", "\"hello\"").unwrap();
/// assert_eq!(storage.raw_get("greeting").as_deref(), Some("\"hello\""));
/// assert_eq!(storage.calls().set, 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    removes: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> StorageCalls {
        StorageCalls {
            get: self.gets.load(Ordering::SeqCst),
            set: self.sets.load(Ordering::SeqCst),
            remove: self.removes.load(Ordering::SeqCst),
            clear: self.clears.load(Ordering::SeqCst),
        }
    }

    /// Reset the call counters without touching the stored entries.
    pub fn reset_calls(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.sets.store(0, Ordering::SeqCst);
        self.removes.store(0, Ordering::SeqCst);
        self.clears.store(0, Ordering::SeqCst);
    }

    /// Read an entry without counting the call.
    pub fn raw_get(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    /// Insert an entry verbatim without counting the call.
    pub fn raw_insert(&self, key: impl Into<String>, value: impl Into<String>) {
        lock(&self.items).insert(key.into(), value.into());
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// Whether the storage holds no entries.
    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }
}

impl StorageMedium for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        lock(&self.items).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        lock(&self.items).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        lock(&self.items).clear();
        Ok(())
    }
}
