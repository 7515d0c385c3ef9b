//! Runtime support for keyed state.
//!
//! This module provides the execution context bindings resolve against: the
//! shared cache, the optional durable storage medium, and the probe that
//! reports whether storage is reachable.

mod context;

pub use context::{is_storage_available, StateRuntime};
