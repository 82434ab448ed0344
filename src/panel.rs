use cache_panel_core::{CallRecord, Ledger, Operation};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Totals over one request's cache calls.
///
/// `hitratio` keeps the panel's historical formula: with both hits and
/// misses it is `100 / hits / misses`, which shrinks as either count grows.
/// See [`hit_ratio`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub calls: usize,
    pub duration: f64,
    pub hits: u64,
    pub misses: u64,
    pub hitratio: f64,
}

impl AggregateStats {
    pub fn from_calls(calls: &[CallRecord]) -> Self {
        let hits = calls.iter().map(CallRecord::hits).sum();
        let misses = calls.iter().map(CallRecord::misses).sum();
        Self {
            calls: calls.len(),
            duration: calls.iter().map(|call| call.duration).sum(),
            hits,
            misses,
            hitratio: hit_ratio(hits, misses),
        }
    }
}

/// Hit ratio as the cache panel has always shown it.
///
/// # Examples
///
/// ```
/// use cache_panel::hit_ratio;
///
/// assert_eq!(hit_ratio(2, 0), 100.0);
/// assert_eq!(hit_ratio(0, 3), 0.0);
/// assert_eq!(hit_ratio(2, 2), 25.0);
/// ```
pub fn hit_ratio(hits: u64, misses: u64) -> f64 {
    if hits > 0 && misses > 0 {
        100.0 / hits as f64 / misses as f64
    } else if hits > 0 {
        100.0
    } else {
        0.0
    }
}

/// Everything the panel template needs for one request.
#[derive(Clone, Debug, Serialize)]
pub struct PanelStats {
    /// Records sorted by descending duration.
    pub calls: Vec<CallRecord>,
    pub stats: AggregateStats,
    /// Invocation count per operation.
    pub commands: BTreeMap<Operation, usize>,
}

impl PanelStats {
    pub fn from_calls(mut calls: Vec<CallRecord>) -> Self {
        let stats = AggregateStats::from_calls(&calls);

        let mut commands = BTreeMap::new();
        for call in &calls {
            *commands.entry(call.function).or_insert(0) += 1;
        }

        // stable: calls of equal duration keep call order
        calls.sort_by(|a, b| b.duration.total_cmp(&a.duration));

        Self {
            calls,
            stats,
            commands,
        }
    }

    /// The mapping handed to a template engine: `calls`, `stats`, `commands`.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Receiver of the computed statistics, typically a template renderer.
pub trait StatsSink {
    fn record_stats(&mut self, stats: PanelStats);
}

impl<F: FnMut(PanelStats)> StatsSink for F {
    fn record_stats(&mut self, stats: PanelStats) {
        self(stats)
    }
}

impl StatsSink for Vec<PanelStats> {
    fn record_stats(&mut self, stats: PanelStats) {
        self.push(stats);
    }
}

/// What a debug toolbar host needs from one of its panels.
pub trait DebugPanel {
    fn name(&self) -> &'static str;
    fn title(&self) -> String;
    fn nav_title(&self) -> String;
    fn nav_subtitle(&self) -> String;
    fn url(&self) -> String;

    fn has_content(&self) -> bool {
        true
    }

    fn template(&self) -> Option<&'static str> {
        None
    }

    fn on_request_start(&self);

    fn finish(&self, sink: &mut dyn StatsSink);
}

/// The cache panel for one request.
///
/// Owns the request's [`Ledger`]; bind the process-wide
/// [`CacheProxy`](cache_panel_core::CacheProxy) to [`ledger`](Self::ledger)
/// and hand the resulting client to the request's code.
///
/// # Examples
///
/// ```
/// use cache_panel::{CachePanel, CacheBackend, CacheProxy, LocMemCache, PanelStats};
/// use serde_json::json;
///
/// let proxy = CacheProxy::install(LocMemCache::new());
///
/// let panel = CachePanel::new();
/// panel.on_request_start();
///
/// let cache = proxy.bind(panel.ledger());
/// cache.get("k1", None).unwrap();
/// cache.set("k1", json!("v1"), None).unwrap();
/// cache.get("k1", None).unwrap();
///
/// let mut rendered: Vec<PanelStats> = Vec::new();
/// let response = panel.on_request_end("<html>", &mut rendered);
///
/// assert_eq!(response, "<html>");
/// assert_eq!(rendered[0].stats.calls, 3);
/// assert_eq!(rendered[0].stats.hits, 1);
/// assert_eq!(rendered[0].stats.misses, 1);
/// assert!(panel.nav_subtitle().starts_with("3 calls, "));
/// ```
#[derive(Clone, Debug, Default)]
pub struct CachePanel {
    ledger: Ledger,
}

impl CachePanel {
    pub const NAME: &'static str = "Cache";
    pub const TEMPLATE: &'static str = "cache_panel/cache.html";

    pub fn new() -> Self {
        Self::default()
    }

    /// Panel recording into an existing ledger.
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Starts a request: forgets every call of the previous one.
    pub fn on_request_start(&self) {
        self.ledger.reset();
    }

    /// Ends a request: hands the statistics to `sink` and returns `response`
    /// untouched.
    pub fn on_request_end<R, S>(&self, response: R, sink: &mut S) -> R
    where
        S: StatsSink + ?Sized,
    {
        let stats = self.stats();
        debug!(
            calls = stats.stats.calls,
            duration_ms = stats.stats.duration,
            hits = stats.stats.hits,
            misses = stats.stats.misses,
            "cache panel finalized"
        );
        sink.record_stats(stats);
        response
    }

    /// Statistics of the calls recorded so far.
    pub fn stats(&self) -> PanelStats {
        PanelStats::from_calls(self.ledger.calls())
    }

    pub fn title(&self) -> &'static str {
        "Cache Calls"
    }

    pub fn nav_title(&self) -> &'static str {
        Self::NAME
    }

    /// `"<n> calls, <d>ms"`, or `"0 calls"` before any call.
    pub fn nav_subtitle(&self) -> String {
        match self.ledger.size() {
            0 => "0 calls".to_string(),
            calls => format!("{} calls, {:.2}ms", calls, self.ledger.total_duration()),
        }
    }

    /// No separate page: everything is shown inline.
    pub fn url(&self) -> &'static str {
        ""
    }
}

impl DebugPanel for CachePanel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn title(&self) -> String {
        CachePanel::title(self).to_string()
    }

    fn nav_title(&self) -> String {
        CachePanel::nav_title(self).to_string()
    }

    fn nav_subtitle(&self) -> String {
        CachePanel::nav_subtitle(self)
    }

    fn url(&self) -> String {
        CachePanel::url(self).to_string()
    }

    fn template(&self) -> Option<&'static str> {
        Some(Self::TEMPLATE)
    }

    fn on_request_start(&self) {
        CachePanel::on_request_start(self)
    }

    fn finish(&self, sink: &mut dyn StatsSink) {
        self.on_request_end((), sink)
    }
}
