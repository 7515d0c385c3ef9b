use crate::cache::{CachedValue, Fetcher, SubscribeOptions, Subscription};
use crate::runtime::StateRuntime;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One consumer's attachment to a cache key.
///
/// Holds the cache subscription, so the entry lives as long as any handle
/// split from the binding.
pub(crate) struct Binding<T> {
    runtime: Arc<StateRuntime>,
    key: String,
    default: Option<T>,
    _subscription: Subscription,
}

impl<T> Binding<T> {
    pub(crate) fn runtime(&self) -> &Arc<StateRuntime> {
        &self.runtime
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

impl<T: Clone + Send + Sync + 'static> Binding<T> {
    pub(crate) fn new(
        runtime: &Arc<StateRuntime>,
        key: String,
        default: Option<T>,
        fetcher: Option<Fetcher>,
    ) -> Self {
        let subscription = runtime
            .cache()
            .subscribe(&key, fetcher, SubscribeOptions::disabled());
        debug!("Bound state '{}'", key);

        Self {
            runtime: Arc::clone(runtime),
            key,
            default,
            _subscription: subscription,
        }
    }

    pub(crate) fn current(&self) -> Option<T> {
        let value = self.runtime.cache().get(&self.key);
        resolve(value.as_ref(), &self.key, &self.default)
    }

    /// Replace the cached value without revalidation.
    pub(crate) fn write(&self, value: Option<T>) {
        let value = value.map(|v| Arc::new(v) as CachedValue);
        self.runtime.cache().mutate(&self.key, value, false);
    }

    /// Put the default back into the cache.
    pub(crate) fn reset(&self) {
        self.write(self.default.clone());
    }

    fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<T>) + Send + Sync + 'static,
    {
        let key = self.key.clone();
        let default = self.default.clone();
        self.runtime
            .cache()
            .watch(&self.key, move |value| callback(resolve(value, &key, &default)))
    }
}

/// Read a typed value out of a cache slot, falling back to `default`.
fn resolve<T: Clone + 'static>(
    value: Option<&CachedValue>,
    key: &str,
    default: &Option<T>,
) -> Option<T> {
    match value {
        None => default.clone(),
        Some(value) => match value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!("Cache entry '{}' holds a value of another type, using default", key);
                default.clone()
            }
        },
    }
}

/// Read handle for a bound key.
///
/// Always reflects the latest write from any binding of the same key.
pub struct StateValue<T> {
    binding: Arc<Binding<T>>,
}

impl<T: Clone + Send + Sync + 'static> StateValue<T> {
    pub(crate) fn new(binding: Arc<Binding<T>>) -> Self {
        Self { binding }
    }

    /// The current value, or the binding's default when the cache holds none.
    pub fn get(&self) -> Option<T> {
        self.binding.current()
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        self.binding.key()
    }

    /// Call `callback` with the new value whenever the key changes.
    ///
    /// The watch stays active until the returned guard is dropped.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<T>) + Send + Sync + 'static,
    {
        self.binding.watch(callback)
    }
}

impl<T> Clone for StateValue<T> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
        }
    }
}

impl<T> fmt::Debug for StateValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateValue")
            .field("key", &self.binding.key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_on_type_mismatch() {
        StateRuntime::scope(|| {
            let runtime = StateRuntime::current();
            let numbers = Binding::new(&runtime, "shared".to_string(), Some(0_u32), None);
            let text = Binding::new(&runtime, "shared".to_string(), Some("none".to_string()), None);

            numbers.write(Some(5));
            assert_eq!(numbers.current(), Some(5));
            assert_eq!(text.current(), Some("none".to_string()));
        });
    }

    #[test]
    fn reset_restores_default() {
        StateRuntime::scope(|| {
            let runtime = StateRuntime::current();
            let binding = Binding::new(&runtime, "flag".to_string(), Some(false), None);
            binding.write(Some(true));
            assert_eq!(binding.current(), Some(true));
            binding.reset();
            assert_eq!(binding.current(), Some(false));
        });
    }

    #[test]
    fn dropping_last_handle_releases_entry() {
        StateRuntime::scope(|| {
            let runtime = StateRuntime::current();
            let binding = Binding::new(&runtime, "temp".to_string(), None::<u8>, None);
            let value = StateValue::new(Arc::new(binding));
            let copy = value.clone();
            drop(value);
            assert!(runtime.cache().contains_key("temp"));
            drop(copy);
            assert!(!runtime.cache().contains_key("temp"));
        });
    }
}
