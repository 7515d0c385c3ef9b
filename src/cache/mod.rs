//! Reactive keyed cache.
//!
//! A process-local registry mapping string keys to a shared value slot with
//! per-key subscribers. Writes through [`KeyedCache::mutate`] are visible to
//! every subscriber of the key as soon as the call returns.

mod cache;
mod options;

pub use cache::{CachedValue, Fetcher, KeyedCache, Subscription};
pub use options::{RevalidateEvent, SubscribeOptions};
