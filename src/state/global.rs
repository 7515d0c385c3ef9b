use crate::runtime::StateRuntime;
use crate::state::binding::{Binding, StateValue};
use std::fmt;
use std::sync::Arc;

/// Keyed state shared in memory, never persisted.
///
/// Every binding of the same key in a runtime sees the same value, which
/// makes it a lightweight way for unrelated parts of a program to
/// coordinate. Values need not be serializable.
pub struct GlobalState<T> {
    binding: Arc<Binding<T>>,
}

impl<T: Clone + Send + Sync + 'static> GlobalState<T> {
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
        Self {
            binding: Arc::new(Binding::new(runtime, key.into(), default, None)),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.binding.current()
    }

    pub fn key(&self) -> &str {
        self.binding.key()
    }

    pub fn set(&self, value: T) {
        self.binding.write(Some(value));
    }

    /// Split into read and write handles.
    pub fn split(self) -> (StateValue<T>, SetState<T>) {
        (
            StateValue::new(Arc::clone(&self.binding)),
            SetState {
                binding: self.binding,
            },
        )
    }
}

impl<T> fmt::Debug for GlobalState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalState")
            .field("key", &self.binding.key())
            .finish()
    }
}

/// Write handle returned by [`use_global_state`].
pub struct SetState<T> {
    binding: Arc<Binding<T>>,
}

impl<T: Clone + Send + Sync + 'static> SetState<T> {
    /// Replace the shared value for the key.
    pub fn set(&self, value: T) {
        self.binding.write(Some(value));
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
        }
    }
}

/// Bind `key` to shared in-memory state in the current runtime.
///
/// Returns the current value handle and a setter, in that order.
///
/// # Example
///
/// ```
/// use cubby::{use_global_state, StateRuntime};
///
/// StateRuntime::scope(|| {
///     let (menu_open, set_menu_open) = use_global_state("menu-open", Some(false));
///     set_menu_open.set(true);
///     assert_eq!(menu_open.get(), Some(true));
/// });
/// ```
pub fn use_global_state<T>(
    key: impl Into<String>,
    default: Option<T>,
) -> (StateValue<T>, SetState<T>)
where
    T: Clone + Send + Sync + 'static,
{
    GlobalState::bind(key, default).split()
}
