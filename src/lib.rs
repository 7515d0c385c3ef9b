//! # Cubby
//!
//! Reactive keyed state shared across consumers and persisted to durable
//! key-value storage.
//!
//! Every binding of the same string key in a runtime observes one shared
//! value. Cubby provides two kinds of binding:
//!
//! ## Persistent state
//!
//! [`use_local_storage`] / [`PersistentState`] seed the shared value from a
//! durable storage medium on first use and write every change back as JSON
//! text, so the value survives reloads. When no medium is available (a
//! server-side or native context without configured storage) the state keeps
//! working in memory and no storage calls are made.
//!
//! ## Global state
//!
//! [`use_global_state`] / [`GlobalState`] share a value in memory only,
//! for coordination between parts of a program that do not know each other.
//!
//! ## Runtime
//!
//! Bindings resolve against the current [`StateRuntime`](runtime::StateRuntime):
//! a process-wide global runtime configured through `CUBBY_STORAGE`, or a
//! scoped runtime pushed for the duration of a closure.
//!
//! ```
//! use cubby::runtime::StateRuntime;
//! use cubby::storage::MemoryStorage;
//! use cubby::{use_global_state, use_local_storage};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! StateRuntime::scope_with_storage(storage.clone(), || {
//!     let (name, set_name, _remove_name) = use_local_storage::<String>("name", None);
//!     set_name.set("Ada".to_string()).unwrap();
//!     assert_eq!(name.get().as_deref(), Some("Ada"));
//!
//!     let (busy, set_busy) = use_global_state("busy", Some(false));
//!     set_busy.set(true);
//!     assert_eq!(busy.get(), Some(true));
//! });
//!
//! // Only the persistent binding reached storage.
//! assert_eq!(storage.raw_get("name").as_deref(), Some("\"Ada\""));
//! assert_eq!(storage.raw_get("busy"), None);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod runtime;
pub mod state;
pub mod storage;

mod sync;

// Re-export main types for convenience
pub use config::{RuntimeConfig, StorageBackend};
pub use error::{Result, StateError};
pub use runtime::{is_storage_available, StateRuntime};
pub use state::{
    use_global_state, use_local_storage, GlobalState, PersistentState, RemoveValue, SetState,
    SetValue, StateValue,
};
