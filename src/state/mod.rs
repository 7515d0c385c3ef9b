//! Keyed state bindings.
//!
//! Two flavours share the runtime's cache:
//! - [`PersistentState`] / [`use_local_storage`] - written through to durable storage
//! - [`GlobalState`] / [`use_global_state`] - in-memory only

mod binding;
mod global;
mod persistent;

pub use binding::StateValue;
pub use global::{use_global_state, GlobalState, SetState};
pub use persistent::{use_local_storage, PersistentState, RemoveValue, SetValue};
