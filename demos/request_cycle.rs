use cache_panel::{
    CacheBackend, CachePanel, CacheProxy, Instrumented, LocMemCache, PanelStats, RecorderConfig,
};
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Pretend view: reads through the cache, filling it on a miss.
fn user_profile(cache: &Instrumented<LocMemCache>, id: u32) -> serde_json::Value {
    let key = format!("user:{id}");
    if let Some(profile) = cache.get(&key, None).unwrap() {
        return profile;
    }
    let profile = json!({"id": id, "name": format!("user {id}"), "roles": ["reader"]});
    cache
        .set(&key, profile.clone(), Some(Duration::from_secs(300)))
        .unwrap();
    profile
}

fn serve(proxy: &CacheProxy<LocMemCache>, panel: &CachePanel, ids: &[u32]) -> PanelStats {
    panel.on_request_start();
    let cache = proxy.bind(panel.ledger());

    for &id in ids {
        user_profile(&cache, id);
    }
    cache.incr("hits:home", 1).unwrap_or_else(|_| {
        cache.set("hits:home", json!(1), None).unwrap();
        1
    });

    let mut rendered = Vec::new();
    panel.on_request_end((), &mut rendered);
    rendered.remove(0)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let proxy = CacheProxy::install_with(
        LocMemCache::builder().max_entries(100).build(),
        RecorderConfig::default().with_max_frames(4),
    );
    let panel = CachePanel::new();

    for (n, ids) in [vec![1, 2], vec![1, 2, 3], vec![3, 3]].iter().enumerate() {
        let stats = serve(&proxy, &panel, ids);
        println!("Request {}: {}", n + 1, panel.nav_subtitle());
        println!(
            "  hits={} misses={} hitratio={:.2}",
            stats.stats.hits, stats.stats.misses, stats.stats.hitratio
        );
        for (command, count) in &stats.commands {
            println!("  {command}: {count}");
        }
        if let Some(slowest) = stats.calls.first() {
            println!(
                "  slowest: {} {} ({:.3}ms) -> {}",
                slowest.function,
                serde_json::to_string(&slowest.key).unwrap_or_default(),
                slowest.duration,
                slowest.value.as_deref().unwrap_or("-"),
            );
        }
    }

    let last = panel.stats();
    if let Some(call) = last.calls.last() {
        println!("\nStack of the last recorded call:\n{}", call.stacktrace);
    }
}
