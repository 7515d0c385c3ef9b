use crate::cache::{RevalidateEvent, SubscribeOptions};
use crate::sync::lock;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// A type-erased value held by the cache.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Supplies the initial value for a key.
pub type Fetcher = Arc<dyn Fn(&str) -> Option<CachedValue> + Send + Sync>;

type Listener = Arc<dyn Fn(Option<&CachedValue>) + Send + Sync>;

struct Subscriber {
    fetcher: Option<Fetcher>,
    options: SubscribeOptions,
    listener: Option<Listener>,
}

#[derive(Default)]
struct CacheEntry {
    value: Option<CachedValue>,
    // Ordered by subscription id so the oldest fetcher wins on revalidation.
    subscribers: BTreeMap<usize, Subscriber>,
}

impl CacheEntry {
    fn listeners(&self) -> Vec<Listener> {
        self.subscribers
            .values()
            .filter_map(|s| s.listener.clone())
            .collect()
    }

    fn first_fetcher(&self) -> Option<Fetcher> {
        self.subscribers.values().find_map(|s| s.fetcher.clone())
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
}

/// An in-memory reactive cache keyed by string.
///
/// Each key owns a single value slot shared by every subscriber of that key.
/// An entry is created by the first subscription (or mutation) and removed
/// when its last [`Subscription`] is dropped; subscribing again re-runs the
/// fetcher. An entry created by [`mutate`](KeyedCache::mutate) on a key nobody
/// subscribes to stays until [`clear`](KeyedCache::clear).
///
/// Listeners and fetchers always run after the internal lock is released, so
/// they may call back into the cache. Removed values and subscribers are also
/// dropped outside the lock, so a listener may own other bindings.
///
/// # Examples
///
/// ```
/// use cubby::cache::{CachedValue, KeyedCache, SubscribeOptions};
/// use std::sync::Arc;
///
/// let cache = KeyedCache::new();
/// let _sub = cache.subscribe("count", None, SubscribeOptions::disabled());
///
/// cache.mutate("count", Some(Arc::new(1_u32) as CachedValue), false);
/// let value = cache.get("count").unwrap();
/// assert_eq!(value.downcast_ref::<u32>(), Some(&1));
/// ```
#[derive(Clone, Default)]
pub struct KeyedCache {
    next_id: Arc<AtomicUsize>,
    inner: Arc<Mutex<CacheInner>>,
}

impl fmt::Debug for KeyedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCache")
            .field("keys", &self.keys())
            .finish()
    }
}

impl KeyedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `key`.
    ///
    /// When the entry holds no value yet, `fetcher` is invoked once to seed
    /// it. Later subscriptions to a populated entry never refetch. The
    /// returned guard keeps the subscription alive.
    pub fn subscribe(
        &self,
        key: &str,
        fetcher: Option<Fetcher>,
        options: SubscribeOptions,
    ) -> Subscription {
        self.register(key, fetcher, options, None)
    }

    /// Subscribe to `key` and call `listener` with the new value on every
    /// change. The listener is not called for the current value.
    pub fn watch<F>(&self, key: &str, listener: F) -> Subscription
    where
        F: Fn(Option<&CachedValue>) + Send + Sync + 'static,
    {
        self.register(
            key,
            None,
            SubscribeOptions::disabled(),
            Some(Arc::new(listener) as Listener),
        )
    }

    fn register(
        &self,
        key: &str,
        fetcher: Option<Fetcher>,
        options: SubscribeOptions,
        listener: Option<Listener>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let seed_with = {
            let mut inner = lock(&self.inner);
            let entry = inner.entries.entry(key.to_string()).or_default();
            let needs_seed = entry.value.is_none();
            entry.subscribers.insert(
                id,
                Subscriber {
                    fetcher: fetcher.clone(),
                    options,
                    listener,
                },
            );
            debug!("Subscribed to '{}' (subscribers: {})", key, entry.subscribers.len());
            if needs_seed {
                fetcher
            } else {
                None
            }
        };

        if let Some(fetcher) = seed_with {
            let value = fetcher(key);
            self.seed(key, value);
        }

        Subscription {
            key: key.to_string(),
            id,
            cache: Arc::downgrade(&self.inner),
        }
    }

    /// Store a fetched value unless another writer got there first.
    fn seed(&self, key: &str, value: Option<CachedValue>) {
        let listeners = {
            let mut inner = lock(&self.inner);
            let Some(entry) = inner.entries.get_mut(key) else {
                return;
            };
            if entry.value.is_some() {
                return;
            }
            entry.value = value.clone();
            entry.listeners()
        };

        debug!("Seeded cache entry: {}", key);
        notify(&listeners, value.as_ref());
    }

    /// Current value for `key`, if the entry exists and holds one.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        lock(&self.inner)
            .entries
            .get(key)
            .and_then(|entry| entry.value.clone())
    }

    /// Replace the value for `key` and notify its listeners.
    ///
    /// With `should_revalidate`, the oldest fetcher registered for the key is
    /// then re-run and its result stored and notified as well.
    pub fn mutate(&self, key: &str, value: Option<CachedValue>, should_revalidate: bool) {
        let fetcher = self.store(key, value);

        if should_revalidate {
            if let Some(fetcher) = fetcher {
                debug!("Revalidating cache entry after mutate: {}", key);
                let fresh = fetcher(key);
                self.store(key, fresh);
            }
        }
    }

    /// Store `value`, notify listeners and return the entry's first fetcher.
    fn store(&self, key: &str, value: Option<CachedValue>) -> Option<Fetcher> {
        let (listeners, fetcher, previous) = {
            let mut inner = lock(&self.inner);
            let entry = inner.entries.entry(key.to_string()).or_default();
            let previous = std::mem::replace(&mut entry.value, value.clone());
            (entry.listeners(), entry.first_fetcher(), previous)
        };
        drop(previous);

        debug!("Updated cache entry: {}", key);
        notify(&listeners, value.as_ref());
        fetcher
    }

    /// Refetch every entry with a subscription that opted into `event`.
    ///
    /// Returns the number of entries refetched.
    pub fn revalidate(&self, event: RevalidateEvent) -> usize {
        let targets: Vec<(String, Fetcher)> = {
            let inner = lock(&self.inner);
            inner
                .entries
                .iter()
                .filter_map(|(key, entry)| {
                    entry
                        .subscribers
                        .values()
                        .filter(|s| s.options.enables(event))
                        .find_map(|s| s.fetcher.clone())
                        .map(|fetcher| (key.clone(), fetcher))
                })
                .collect()
        };

        debug!("Revalidating {} entries on {}", targets.len(), event);

        for (key, fetcher) in &targets {
            let fresh = fetcher(key.as_str());
            self.store(key, fresh);
        }
        targets.len()
    }

    /// Number of live subscriptions for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        lock(&self.inner)
            .entries
            .get(key)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Whether an entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        lock(&self.inner).entries.contains_key(key)
    }

    /// Keys with a live entry, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.inner).entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).entries.is_empty()
    }

    /// Drop every entry and subscriber registration.
    ///
    /// Outstanding [`Subscription`] guards become no-ops.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut lock(&self.inner).entries);
        drop(entries);
    }
}

fn notify(listeners: &[Listener], value: Option<&CachedValue>) {
    for listener in listeners {
        listener(value);
    }
}

/// RAII guard for a cache subscription.
///
/// Dropping the last subscription for a key removes its entry.
pub struct Subscription {
    key: String,
    id: usize,
    cache: Weak<Mutex<CacheInner>>,
}

impl Subscription {
    /// The subscribed key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.cache.upgrade() else {
            return;
        };
        // Dropped after the guard: a subscriber or value may own other
        // subscriptions to this cache.
        let (_subscriber, _entry) = {
            let mut inner = lock(&inner);
            let Some(entry) = inner.entries.get_mut(&self.key) else {
                return;
            };
            let subscriber = entry.subscribers.remove(&self.id);
            let released = if entry.subscribers.is_empty() {
                debug!("Released cache entry: {}", self.key);
                inner.entries.remove(&self.key)
            } else {
                None
            };
            (subscriber, released)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(n: u32) -> Option<CachedValue> {
        Some(Arc::new(n) as CachedValue)
    }

    fn read(cache: &KeyedCache, key: &str) -> Option<u32> {
        cache.get(key).and_then(|v| v.downcast_ref::<u32>().copied())
    }

    fn counting_fetcher(calls: &Arc<AtomicUsize>, n: u32) -> Fetcher {
        let calls = Arc::clone(calls);
        Arc::new(move |_key: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            value(n)
        })
    }

    #[test]
    fn fetcher_seeds_fresh_entry_once() {
        let cache = KeyedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _a = cache.subscribe(
            "key",
            Some(counting_fetcher(&calls, 7)),
            SubscribeOptions::disabled(),
        );
        let _b = cache.subscribe(
            "key",
            Some(counting_fetcher(&calls, 8)),
            SubscribeOptions::disabled(),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(read(&cache, "key"), Some(7));
        assert_eq!(cache.subscriber_count("key"), 2);
    }

    #[test]
    fn subscribe_without_fetcher_leaves_entry_empty() {
        let cache = KeyedCache::new();
        let _sub = cache.subscribe("key", None, SubscribeOptions::default());
        assert!(cache.contains_key("key"));
        assert!(cache.get("key").is_none());
    }

    #[test]
    fn last_drop_removes_entry_and_resubscribe_refetches() {
        let cache = KeyedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let a = cache.subscribe(
            "key",
            Some(counting_fetcher(&calls, 1)),
            SubscribeOptions::disabled(),
        );
        let b = cache.subscribe("key", None, SubscribeOptions::disabled());
        drop(a);
        assert!(cache.contains_key("key"));
        drop(b);
        assert!(!cache.contains_key("key"));
        assert!(cache.is_empty());

        let _c = cache.subscribe(
            "key",
            Some(counting_fetcher(&calls, 2)),
            SubscribeOptions::disabled(),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(read(&cache, "key"), Some(2));
    }

    #[test]
    fn mutate_without_revalidation_skips_fetcher() {
        let cache = KeyedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let _sub = cache.subscribe(
            "key",
            Some(counting_fetcher(&calls, 1)),
            SubscribeOptions::disabled(),
        );

        cache.mutate("key", value(5), false);
        assert_eq!(read(&cache, "key"), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mutate_with_revalidation_refetches() {
        let cache = KeyedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let _sub = cache.subscribe(
            "key",
            Some(counting_fetcher(&calls, 1)),
            SubscribeOptions::disabled(),
        );

        cache.mutate("key", value(5), true);
        assert_eq!(read(&cache, "key"), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn watchers_see_every_change() {
        let cache = KeyedCache::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let _watch = cache.watch("key", move |v| {
            let n = v.and_then(|v| v.downcast_ref::<u32>().copied());
            seen_clone.lock().unwrap().push(n);
        });

        cache.mutate("key", value(1), false);
        cache.mutate("key", None, false);
        cache.mutate("other", value(9), false);

        assert_eq!(*seen.lock().unwrap(), vec![Some(1), None]);
    }

    #[test]
    fn listener_may_reenter_cache() {
        let cache = KeyedCache::new();
        let inner = cache.clone();
        let _watch = cache.watch("source", move |v| {
            inner.mutate("mirror", v.cloned(), false);
        });

        cache.mutate("source", value(3), false);
        assert_eq!(read(&cache, "mirror"), Some(3));
    }

    #[test]
    fn watch_guard_may_own_other_subscriptions() {
        let cache = KeyedCache::new();
        let held = cache.subscribe("b", None, SubscribeOptions::disabled());
        let target = cache.clone();
        let guard = cache.watch("a", move |v| {
            assert_eq!(held.key(), "b");
            target.mutate("b", v.cloned(), false);
        });

        cache.mutate("a", value(4), false);
        assert_eq!(read(&cache, "b"), Some(4));

        drop(guard);
        assert!(!cache.contains_key("a"));
        assert!(!cache.contains_key("b"));
    }

    #[test]
    fn replaced_value_may_own_subscriptions() {
        let cache = KeyedCache::new();
        let _sub = cache.subscribe("key", None, SubscribeOptions::disabled());
        let held = cache.subscribe("other", None, SubscribeOptions::disabled());
        cache.mutate("key", Some(Arc::new(held) as CachedValue), false);

        cache.mutate("key", value(1), false);
        assert!(!cache.contains_key("other"));

        let watcher = cache.watch("other", |_| {});
        cache.mutate("key", Some(Arc::new(watcher) as CachedValue), false);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn revalidate_respects_options() {
        let cache = KeyedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _focused = cache.subscribe(
            "focused",
            Some(counting_fetcher(&calls, 1)),
            SubscribeOptions::disabled().revalidate_on_focus(true),
        );
        let _quiet = cache.subscribe(
            "quiet",
            Some(counting_fetcher(&calls, 1)),
            SubscribeOptions::disabled(),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(cache.revalidate(RevalidateEvent::Focus), 1);
        assert_eq!(cache.revalidate(RevalidateEvent::Offline), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn clear_detaches_subscriptions() {
        let cache = KeyedCache::new();
        let sub = cache.subscribe("key", None, SubscribeOptions::disabled());
        cache.mutate("key", value(1), false);
        cache.clear();
        assert!(cache.is_empty());
        drop(sub);
        assert!(cache.is_empty());
    }

    #[test]
    fn unsubscribed_mutation_stays_until_clear() {
        let cache = KeyedCache::new();
        cache.mutate("orphan", value(1), false);
        drop(cache.subscribe("orphan", None, SubscribeOptions::disabled()));
        assert!(!cache.contains_key("orphan"));

        cache.mutate("orphan", value(2), false);
        assert_eq!(read(&cache, "orphan"), Some(2));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let cache = KeyedCache::new();
        cache.mutate("b", value(1), false);
        cache.mutate("a", value(2), false);
        assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cache.len(), 2);
    }
}
