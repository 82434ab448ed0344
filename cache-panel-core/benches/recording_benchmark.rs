use cache_panel_core::{summarize, CacheBackend, CacheProxy, Ledger, LocMemCache, RecorderConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::hint::black_box;

fn seeded(size: usize) -> LocMemCache {
    let cache = LocMemCache::new();
    for i in 0..size {
        cache.set(&format!("key{}", i), json!(i), None).unwrap();
    }
    cache
}

fn bench_get_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_overhead");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("raw", size), size, |b, &size| {
            let cache = seeded(size);
            b.iter(|| {
                for i in 0..size {
                    black_box(cache.get(&format!("key{}", i), None).unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("recorded", size), size, |b, &size| {
            let proxy = CacheProxy::install_with(
                seeded(size),
                RecorderConfig::default().with_source_lines(false),
            );
            let ledger = Ledger::new();
            let cache = proxy.bind(&ledger);
            b.iter(|| {
                ledger.reset();
                for i in 0..size {
                    black_box(cache.get(&format!("key{}", i), None).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_stack_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_capture");

    for (name, source_lines) in [("frames_only", false), ("with_source", true)] {
        group.bench_function(name, |b| {
            let proxy = CacheProxy::install_with(
                seeded(1),
                RecorderConfig::default().with_source_lines(source_lines),
            );
            let ledger = Ledger::new();
            let cache = proxy.bind(&ledger);
            b.iter(|| {
                ledger.reset();
                black_box(cache.has_key("key0").unwrap());
            });
        });
    }

    group.finish();
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    let small = json!({"id": 1, "name": "Ada"});
    let large = json!((0..1000).collect::<Vec<i32>>());

    group.bench_function("small_object", |b| b.iter(|| summarize(black_box(&small))));
    group.bench_function("large_array", |b| b.iter(|| summarize(black_box(&large))));

    group.finish();
}

criterion_group!(
    benches,
    bench_get_overhead,
    bench_stack_capture,
    bench_summarize
);
criterion_main!(benches);
