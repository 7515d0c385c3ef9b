use crate::cache::KeyedCache;
use crate::config::{RuntimeConfig, StorageBackend};
use crate::error::{Result, StateError};
use crate::storage::{FileStorage, MemoryStorage, StorageMedium};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Execution context for keyed state.
///
/// A runtime owns the [`KeyedCache`] shared by every binding created in it,
/// plus the durable storage medium persistent state writes through to (if
/// any). Supports both a global runtime (default) and scoped runtimes for
/// isolation.
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use cubby::use_global_state;
///
/// let (value, set_value) = use_global_state::<u32>("docs:global", None);
/// set_value.set(42);
/// assert_eq!(value.get(), Some(42));
/// ```
///
/// Using a scoped runtime with in-memory storage:
///
/// ```
/// use cubby::runtime::StateRuntime;
/// use cubby::storage::MemoryStorage;
/// use cubby::use_local_storage;
/// use std::sync::Arc;
///
/// let storage = Arc::new(MemoryStorage::new());
/// StateRuntime::scope_with_storage(storage.clone(), || {
///     let (_value, set_value, _remove) = use_local_storage::<String>("name", None);
///     set_value.set("Ada".to_string()).unwrap();
/// });
/// assert_eq!(storage.raw_get("name").as_deref(), Some("\"Ada\""));
/// ```
pub struct StateRuntime {
    cache: KeyedCache,
    storage: Option<Arc<dyn StorageMedium>>,
}

impl fmt::Debug for StateRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRuntime")
            .field("cache", &self.cache)
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<StateRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl StateRuntime {
    /// Create a runtime without durable storage.
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Create a runtime that persists through `storage`.
    pub fn with_storage(storage: Arc<dyn StorageMedium>) -> Arc<Self> {
        Self::build(Some(storage))
    }

    /// Create a runtime from configuration.
    ///
    /// `StorageBackend::Web` resolves to no storage when `localStorage` is
    /// unreachable, and is rejected on builds without the `web` feature.
    pub fn from_config(config: &RuntimeConfig) -> Result<Arc<Self>> {
        let storage: Option<Arc<dyn StorageMedium>> = match &config.backend {
            StorageBackend::None => None,
            StorageBackend::Memory => {
                Some(Arc::new(MemoryStorage::new()) as Arc<dyn StorageMedium>)
            }
            StorageBackend::File { path } => {
                Some(Arc::new(FileStorage::open(path)?) as Arc<dyn StorageMedium>)
            }
            StorageBackend::Web => web_storage()?,
        };
        info!("Initializing state runtime (backend: {})", config.backend);
        Ok(Self::build(storage))
    }

    fn build(storage: Option<Arc<dyn StorageMedium>>) -> Arc<Self> {
        Arc::new(Self {
            cache: KeyedCache::new(),
            storage,
        })
    }

    /// Run a function with a fresh runtime that has no durable storage.
    ///
    /// The runtime and all its state is dropped when the function returns.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// Run a function with a fresh runtime persisting through `storage`.
    pub fn scope_with_storage<F, R>(storage: Arc<dyn StorageMedium>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::with_storage(storage), f)
    }

    /// Get or create the global runtime (fallback).
    ///
    /// Built once from [`RuntimeConfig::from_env`]. An invalid configuration
    /// is logged and replaced by the platform default.
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<StateRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(|| {
            let config = RuntimeConfig::from_env().unwrap_or_else(|e| {
                warn!("Ignoring invalid runtime configuration: {}", e);
                RuntimeConfig::default()
            });
            Self::from_config(&config).unwrap_or_else(|e| {
                warn!("Falling back to default storage backend: {}", e);
                Self::build(default_storage())
            })
        }))
    }

    /// Get the current runtime (scoped or global fallback).
    ///
    /// Returns the runtime from the top of the thread-local stack,
    /// or the global runtime if no scoped runtime is active.
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// This pushes the runtime onto the thread-local stack for the duration
    /// of the function execution.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// The cache shared by every binding in this runtime.
    pub fn cache(&self) -> &KeyedCache {
        &self.cache
    }

    /// The durable storage medium, when one is attached.
    pub fn storage(&self) -> Option<&Arc<dyn StorageMedium>> {
        self.storage.as_ref()
    }

    /// Whether persistent state can reach durable storage in this runtime.
    pub fn is_storage_available(&self) -> bool {
        self.storage.is_some()
    }

    /// Drop every cache entry. Durable storage is left untouched.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

/// Whether the current runtime has durable storage attached.
///
/// Cheap and side-effect free; the bindings consult it before every storage
/// access.
pub fn is_storage_available() -> bool {
    StateRuntime::current().is_storage_available()
}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
fn web_storage() -> Result<Option<Arc<dyn StorageMedium>>> {
    Ok(default_storage())
}

#[cfg(not(all(feature = "web", target_arch = "wasm32")))]
fn web_storage() -> Result<Option<Arc<dyn StorageMedium>>> {
    Err(StateError::Config(
        "web storage requires the `web` feature on wasm32".to_string(),
    ))
}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
fn default_storage() -> Option<Arc<dyn StorageMedium>> {
    crate::storage::WebStorage::detect().map(|s| Arc::new(s) as Arc<dyn StorageMedium>)
}

#[cfg(not(all(feature = "web", target_arch = "wasm32")))]
fn default_storage() -> Option<Arc<dyn StorageMedium>> {
    None
}
