use crate::error::{Result, StateError};
use crate::storage::StorageMedium;
use crate::sync::lock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// A storage medium backed by a single JSON file.
///
/// The file holds one JSON object mapping keys to their stored text. Entries
/// are loaded once on [`open`](FileStorage::open) and every mutation rewrites
/// the whole file before returning, so a later process sees the same data.
/// A mutation whose write fails leaves the in-memory view unchanged.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file starts empty and is created on the first write. A file
    /// that exists but is not a JSON object of strings is rejected.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items: BTreeMap<String, String> = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text).map_err(|e| {
                    StateError::Storage(format!("corrupt storage file {}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened file storage {} ({} entries)", path.display(), items.len());

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let text = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageMedium for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = lock(&self.items);
        let mut next = items.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *items = next;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = lock(&self.items);
        let Some(previous) = items.remove(key) else {
            return Ok(());
        };
        self.persist(&items).inspect_err(|_| {
            items.insert(key.to_string(), previous);
        })
    }

    fn clear(&self) -> Result<()> {
        let mut items = lock(&self.items);
        self.persist(&BTreeMap::new())?;
        items.clear();
        Ok(())
    }
}
