use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use cubby::cache::{CachedValue, KeyedCache, SubscribeOptions};
use cubby::storage::MemoryStorage;
use cubby::{GlobalState, PersistentState, StateRuntime};

fn bind_benchmark(c: &mut Criterion) {
    let runtime = StateRuntime::with_storage(Arc::new(MemoryStorage::new()));

    c.bench_function("persistent_bind", |b| {
        b.iter(|| {
            black_box(PersistentState::bind_in(&runtime, black_box("bench"), Some(0_u64)));
        });
    });
}

fn read_benchmark(c: &mut Criterion) {
    let runtime = StateRuntime::new();
    let state = GlobalState::bind_in(&runtime, "bench", Some(42_u64));

    c.bench_function("state_read", |b| {
        b.iter(|| {
            black_box(state.get());
        });
    });
}

fn global_write_benchmark(c: &mut Criterion) {
    let runtime = StateRuntime::new();
    let state = GlobalState::bind_in(&runtime, "bench", Some(0_u64));

    c.bench_function("global_write", |b| {
        let mut i = 0;
        b.iter(|| {
            state.set(black_box(i));
            i += 1;
        });
    });
}

fn persistent_write_benchmark(c: &mut Criterion) {
    #[derive(Clone, serde::Serialize, serde::Deserialize)]
    struct Settings {
        counter: u64,
        name: String,
    }

    let runtime = StateRuntime::with_storage(Arc::new(MemoryStorage::new()));
    let state = PersistentState::<Settings>::bind_in(&runtime, "bench", None);

    c.bench_function("persistent_write", |b| {
        let mut i = 0;
        b.iter(|| {
            let _ = state.set(Settings {
                counter: black_box(i),
                name: "bench".to_string(),
            });
            i += 1;
        });
    });
}

fn watcher_fanout_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("watcher_fanout");

    for watcher_count in [1, 10, 100].iter() {
        let cache = KeyedCache::new();
        let _subscription = cache.subscribe("bench", None, SubscribeOptions::disabled());
        let _watchers: Vec<_> = (0..*watcher_count)
            .map(|_| {
                cache.watch("bench", |_| {
                    // Empty watcher
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(watcher_count),
            watcher_count,
            |b, _| {
                let mut i = 0_u64;
                b.iter(|| {
                    cache.mutate("bench", Some(Arc::new(black_box(i)) as CachedValue), false);
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bind_benchmark,
    read_benchmark,
    global_write_benchmark,
    persistent_write_benchmark,
    watcher_fanout_benchmark,
);
criterion_main!(benches);
