#![cfg(feature = "stacktrace")]

use cache_panel::{CacheBackend, CacheProxy, CachePanel, LocMemCache, RecorderConfig};
use serde_json::json;

fn lookup_profile(cache: &impl CacheBackend<Value = serde_json::Value>) {
    cache.get("profile:1", None).unwrap();
}

#[test]
fn test_recorded_stack_shows_calling_code() {
    let proxy = CacheProxy::install(LocMemCache::new());
    let panel = CachePanel::new();
    let cache = proxy.bind(panel.ledger());

    lookup_profile(&cache);

    let call = panel.ledger().last().unwrap();
    assert!(call.stacktrace.contains("lookup_profile"));
    assert!(call.stacktrace.contains("<span class=\"file\">stacktrace_tests.rs</span>"));
    assert!(call.stacktrace.contains("cache.get(&quot;profile:1&quot;, None).unwrap();"));
    assert!(!call.stacktrace.contains("<span class=\"file\">recorder.rs</span>"));
}

#[test]
fn test_outermost_frame_first() {
    let proxy = CacheProxy::install_with(
        LocMemCache::new(),
        RecorderConfig::default().with_source_lines(false),
    );
    let panel = CachePanel::new();
    let cache = proxy.bind(panel.ledger());

    lookup_profile(&cache);

    let trace = panel.ledger().last().unwrap().stacktrace;
    let caller = trace.find("test_outermost_frame_first").unwrap();
    let callee = trace.find("lookup_profile").unwrap();
    assert!(caller < callee);
}

#[test]
fn test_frame_limit_keeps_innermost() {
    let proxy = CacheProxy::install_with(
        LocMemCache::new(),
        RecorderConfig::default()
            .with_source_lines(false)
            .with_max_frames(1),
    );
    let panel = CachePanel::new();
    let cache = proxy.bind(panel.ledger());

    lookup_profile(&cache);
    cache.set("k", json!(1), None).unwrap();

    let calls = panel.ledger().calls();
    assert!(calls[0].stacktrace.contains("lookup_profile"));
    assert_eq!(calls[0].stacktrace.matches("<span class=\"func\">").count(), 1);
}
