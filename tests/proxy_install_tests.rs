use cache_panel::{CacheBackend, CacheProxy, CachePanel, LocMemCache, RecorderConfig};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn quiet() -> RecorderConfig {
    RecorderConfig::default().with_source_lines(false)
}

#[test]
fn test_double_install_records_once_per_request() {
    let startup = CachePanel::new();
    let first = CacheProxy::install_with(LocMemCache::new(), quiet());
    let second = CacheProxy::install(first.bind(startup.ledger()));
    assert!(second.is_passthrough());

    for _ in 0..3 {
        let panel = CachePanel::new();
        panel.on_request_start();
        let cache = second.bind(panel.ledger());
        cache.set("k", json!(1), None).unwrap();
        cache.get("k", None).unwrap();

        let stats = panel.stats();
        assert_eq!(stats.stats.calls, 2);
        assert_eq!(stats.stats.hits, 1);
    }

    assert_eq!(startup.ledger().size(), 0);
}

#[test]
fn test_shared_backend_stays_reachable_unrecorded() {
    let backend = Arc::new(LocMemCache::new());
    let proxy = CacheProxy::install_shared(Arc::clone(&backend), quiet());
    let panel = CachePanel::new();
    let cache = proxy.bind(panel.ledger());

    cache.set("k", json!("v"), None).unwrap();
    assert_eq!(backend.get("k", None).unwrap(), Some(json!("v")));
    assert_eq!(proxy.backend().len(), 1);
    assert_eq!(panel.ledger().size(), 1);
}

#[test]
fn test_concurrent_requests_are_isolated() {
    let proxy = CacheProxy::install_with(LocMemCache::new(), quiet());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let proxy = proxy.clone();
            thread::spawn(move || {
                let panel = CachePanel::new();
                panel.on_request_start();
                let cache = proxy.bind(panel.ledger());
                let key = format!("worker:{worker}");
                for i in 0..=worker {
                    cache.set(&key, json!(i), None).unwrap();
                }
                cache.get(&key, None).unwrap();
                (worker, panel.stats())
            })
        })
        .collect();

    for handle in handles {
        let (worker, stats) = handle.join().unwrap();
        assert_eq!(stats.stats.calls, worker + 2);
        assert_eq!(stats.stats.hits, 1);
        assert_eq!(stats.stats.misses, 0);
        let expected_key = format!("\"worker:{worker}\"");
        for call in &stats.calls {
            assert_eq!(serde_json::to_string(&call.key).unwrap(), expected_key);
        }
    }
}

#[test]
fn test_fan_out_within_one_request() {
    let proxy = CacheProxy::install_with(LocMemCache::new(), quiet());
    let panel = CachePanel::new();
    panel.on_request_start();

    thread::scope(|scope| {
        for worker in 0..4 {
            let cache = proxy.bind(panel.ledger());
            scope.spawn(move || {
                for i in 0..25 {
                    cache.set(&format!("{worker}:{i}"), json!(i), None).unwrap();
                }
            });
        }
    });

    assert_eq!(panel.stats().stats.calls, 100);
}
