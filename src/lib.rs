//! # Cache Panel
//!
//! A debug-toolbar panel that shows every cache call made while serving a
//! request: which operation, with which key and arguments, how long it took,
//! whether a read was a hit or a miss, and the code that issued it.
//!
//! ## Features
//!
//! - **Transparent**: the instrumented client implements the same
//!   [`CacheBackend`] trait as the backend it wraps
//! - **Per-request**: calls land in the [`Ledger`] of the request that made them
//! - **Statistics**: call count, total time, hits, misses and hit ratio
//! - **Command counts**: how often each operation was used
//! - **Stack traces**: rendered to HTML for the panel template
//!
//! ## Quick Start
//!
//! Install the proxy once at startup, then bind it to each request's panel:
//!
//! ```rust
//! use cache_panel::{CacheBackend, CachePanel, CacheProxy, LocMemCache, PanelStats};
//! use serde_json::json;
//!
//! let proxy = CacheProxy::install(LocMemCache::new());
//!
//! // per request
//! let panel = CachePanel::new();
//! panel.on_request_start();
//! let cache = proxy.bind(panel.ledger());
//!
//! assert_eq!(cache.get("user:1", None).unwrap(), None);
//! cache.set("user:1", json!({"name": "Ada"}), None).unwrap();
//! assert!(cache.get("user:1", None).unwrap().is_some());
//!
//! let mut rendered: Vec<PanelStats> = Vec::new();
//! panel.on_request_end((), &mut rendered);
//!
//! let stats = &rendered[0];
//! assert_eq!(stats.stats.calls, 3);
//! assert_eq!(stats.stats.hits, 1);
//! assert_eq!(stats.stats.misses, 1);
//! assert_eq!(stats.commands.len(), 2);
//! ```
//!
//! ## Hit Ratio
//!
//! The panel keeps its long-standing hit ratio formula, see [`hit_ratio`].
//!
//! ## Custom Backends
//!
//! Implement [`CacheBackend`] for your client. Operations you leave out
//! fail with [`CacheError::Unsupported`], and the failed call still shows up
//! in the panel:
//!
//! ```rust
//! use cache_panel::{CacheBackend, CacheError, CacheProxy, CacheResult, CachePanel};
//! use std::time::Duration;
//!
//! struct Constant;
//!
//! impl CacheBackend for Constant {
//!     type Value = i64;
//!
//!     fn get(&self, _key: &str, _default: Option<i64>) -> CacheResult<Option<i64>> {
//!         Ok(Some(7))
//!     }
//! }
//!
//! let proxy = CacheProxy::install(Constant);
//! let panel = CachePanel::new();
//! let cache = proxy.bind(panel.ledger());
//!
//! assert_eq!(cache.get("any", None).unwrap(), Some(7));
//! assert!(matches!(
//!     cache.set("any", 1, Some(Duration::from_secs(1))),
//!     Err(CacheError::Unsupported(_))
//! ));
//! assert_eq!(panel.ledger().size(), 2);
//! ```
//!
//! ## Logging
//!
//! Installation and request finalization emit `tracing` events; attach any
//! subscriber to see them.
mod panel;

pub use cache_panel_core::*;
pub use panel::{hit_ratio, AggregateStats, CachePanel, DebugPanel, PanelStats, StatsSink};
