use crate::cache::{CachedValue, Fetcher};
use crate::error::{Result, StateError};
use crate::runtime::StateRuntime;
use crate::state::binding::{Binding, StateValue};
use crate::storage::StorageMedium;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keyed state persisted to the runtime's durable storage.
///
/// The first binding of a key seeds the shared cache from storage; every
/// later binding of the same key reads the cache. Writes go to the cache
/// first and then to storage as JSON text. Without durable storage the
/// state still works, purely in memory.
///
/// A stored entry that cannot be decoded as `T` is logged, **deleted from
/// storage** and replaced by the default. This includes well-formed JSON of
/// another shape, so two bindings of one key with different types will
/// discard each other's data. A stored `null` also yields the default and is
/// left in place.
///
/// # Examples
///
/// ```
/// use cubby::runtime::StateRuntime;
/// use cubby::storage::MemoryStorage;
/// use cubby::PersistentState;
/// use std::sync::Arc;
///
/// let storage = Arc::new(MemoryStorage::new());
/// let runtime = StateRuntime::with_storage(storage.clone());
///
/// let theme = PersistentState::bind_in(&runtime, "theme", Some("light".to_string()));
/// assert_eq!(theme.get().as_deref(), Some("light"));
///
/// theme.set("dark".to_string()).unwrap();
/// assert_eq!(storage.raw_get("theme").as_deref(), Some("\"dark\""));
///
/// theme.remove().unwrap();
/// assert_eq!(theme.get().as_deref(), Some("light"));
/// assert_eq!(storage.raw_get("theme"), None);
/// ```
pub struct PersistentState<T> {
    binding: Arc<Binding<T>>,
}

impl<T> PersistentState<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Bind `key` in the current runtime.
    pub fn bind(key: impl Into<String>, default: Option<T>) -> Self {
        Self::bind_in(&StateRuntime::current(), key, default)
    }

    /// Bind `key` in a specific runtime.
    pub fn bind_in(
        runtime: &Arc<StateRuntime>,
        key: impl Into<String>,
        default: Option<T>,
    ) -> Self {
        let fetcher = storage_fetcher(runtime.storage().cloned(), default.clone());
        let binding = Binding::new(runtime, key.into(), default, Some(fetcher));
        Self {
            binding: Arc::new(binding),
        }
    }

    /// The current value, or the default.
    pub fn get(&self) -> Option<T> {
        self.binding.current()
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        self.binding.key()
    }

    /// Write `value` to the cache and, when available, to storage.
    pub fn set(&self, value: T) -> Result<()> {
        write_through(&self.binding, value)
    }

    /// Reset to the default and delete the stored entry.
    pub fn remove(&self) -> Result<()> {
        remove_through(&self.binding)
    }

    /// Split into read, write and remove handles.
    pub fn split(self) -> (StateValue<T>, SetValue<T>, RemoveValue<T>) {
        (
            StateValue::new(Arc::clone(&self.binding)),
            SetValue {
                binding: Arc::clone(&self.binding),
            },
            RemoveValue {
                binding: self.binding,
            },
        )
    }
}

impl<T> fmt::Debug for PersistentState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentState")
            .field("key", &self.binding.key())
            .finish()
    }
}

/// Write handle returned by [`use_local_storage`].
pub struct SetValue<T> {
    binding: Arc<Binding<T>>,
}

impl<T> SetValue<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    /// Write `value` to the cache and, when available, to storage.
    ///
    /// Fails with [`StateError::Serialization`] before touching anything if
    /// `value` cannot be encoded. A storage failure is returned after the
    /// cache has already been updated.
    pub fn set(&self, value: T) -> Result<()> {
        write_through(&self.binding, value)
    }
}

/// Remove handle returned by [`use_local_storage`].
pub struct RemoveValue<T> {
    binding: Arc<Binding<T>>,
}

impl<T> RemoveValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Reset the cache to the default and delete the stored entry.
    pub fn remove(&self) -> Result<()> {
        remove_through(&self.binding)
    }
}

impl<T> Clone for SetValue<T> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
        }
    }
}

impl<T> Clone for RemoveValue<T> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
        }
    }
}

/// Bind `key` to durable storage in the current runtime.
///
/// Returns the current value handle, a setter and a remover, in that order.
///
/// # Examples
///
/// ```
/// use cubby::runtime::StateRuntime;
/// use cubby::use_local_storage;
///
/// StateRuntime::scope(|| {
///     let (count, set_count, remove_count) = use_local_storage("count", Some(0_u32));
///     set_count.set(3).unwrap();
///     assert_eq!(count.get(), Some(3));
///     remove_count.remove().unwrap();
///     assert_eq!(count.get(), Some(0));
/// });
/// ```
pub fn use_local_storage<T>(
    key: impl Into<String>,
    default: Option<T>,
) -> (StateValue<T>, SetValue<T>, RemoveValue<T>)
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    PersistentState::bind(key, default).split()
}

fn storage_fetcher<T>(storage: Option<Arc<dyn StorageMedium>>, default: Option<T>) -> Fetcher
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    Arc::new(move |key: &str| {
        seed_from_storage(storage.as_deref(), key, &default).map(|v| Arc::new(v) as CachedValue)
    })
}

/// Initial value for `key`: the decoded stored entry, else `default`.
fn seed_from_storage<T>(
    storage: Option<&dyn StorageMedium>,
    key: &str,
    default: &Option<T>,
) -> Option<T>
where
    T: DeserializeOwned + Clone,
{
    let Some(storage) = storage else {
        return default.clone();
    };

    let text = match storage.get_item(key) {
        Ok(Some(text)) => text,
        Ok(None) => return default.clone(),
        Err(e) => {
            warn!("Failed to read '{}' from storage, using default: {}", key, e);
            return default.clone();
        }
    };

    match decode::<T>(key, &text) {
        Ok(Some(value)) => {
            debug!("Seeded '{}' from storage", key);
            Some(value)
        }
        Ok(None) => default.clone(),
        Err(e) => {
            warn!("Discarding malformed stored value: {}", e);
            if let Err(e) = storage.remove_item(key) {
                warn!("Failed to remove malformed entry '{}': {}", key, e);
            }
            default.clone()
        }
    }
}

/// Decode stored JSON text. `null` decodes to `None`.
fn decode<T: DeserializeOwned>(key: &str, text: &str) -> Result<Option<T>> {
    let to_error = |source: serde_json::Error| StateError::Deserialization {
        key: key.to_string(),
        source,
    };

    let value: serde_json::Value = serde_json::from_str(text).map_err(to_error)?;
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value).map(Some).map_err(to_error)
}

// Order: encode, then cache, then storage. An encode failure leaves both
// untouched; a storage failure leaves the cache ahead of storage.
fn write_through<T>(binding: &Binding<T>, value: T) -> Result<()>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    let Some(storage) = binding.runtime().storage() else {
        binding.write(Some(value));
        return Ok(());
    };

    let text = serde_json::to_string(&value)?;
    binding.write(Some(value));

    storage.set_item(binding.key(), &text).inspect_err(|e| {
        warn!("Failed to persist '{}': {}", binding.key(), e);
    })?;
    debug!("Persisted '{}' ({} bytes)", binding.key(), text.len());
    Ok(())
}

fn remove_through<T>(binding: &Binding<T>) -> Result<()>
where
    T: Clone + Send + Sync + 'static,
{
    binding.reset();

    if let Some(storage) = binding.runtime().storage() {
        storage.remove_item(binding.key()).inspect_err(|e| {
            warn!("Failed to remove '{}' from storage: {}", binding.key(), e);
        })?;
        debug!("Removed '{}' from storage", binding.key());
    }
    Ok(())
}
