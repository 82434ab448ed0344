//! # Cache Panel Core
//!
//! Recording machinery behind the cache debug panel.
//!
//! Every call an application makes on its cache client during a request is
//! timed, classified as hit or miss when it is a read, summarized and appended
//! to that request's [`Ledger`]. The panel then turns the ledger into
//! statistics.
//!
//! ## Features
//!
//! - **Operation trait**: [`CacheBackend`] describes the cache operation set;
//!   unimplemented operations fail with [`CacheError::Unsupported`]
//! - **Interception**: [`CacheProxy`] is installed once per process and bound
//!   per request, yielding an [`Instrumented`] client with the same interface
//! - **Per-request isolation**: each request records into its own [`Ledger`]
//! - **Bounded summaries**: arguments and results shown in at most 100 characters
//! - **Stack traces**: the calling code of every cache call, rendered as HTML
//!   (cargo feature `stacktrace`, on by default)
//! - **Reference backend**: [`LocMemCache`], an in-memory client with TTL and LRU
//!
//! ## Module Organization
//!
//! - [`backend`] - The cache operation trait
//! - [`ledger`] - The per-request call log
//! - [`recorder`] - Timing and classification of one call
//! - [`proxy`] - Installation and per-request binding
//! - [`summarize`] - Display strings for values
//! - [`stacktrace`] - Stack capture and rendering
//! - [`locmem`] - In-memory backend
//!
mod cache_entry;
mod config;
mod error;
mod operation;
mod record;

pub mod backend;
pub mod ledger;
pub mod locmem;
pub mod proxy;
pub mod recorder;
pub mod stacktrace;
pub mod summarize;

pub use backend::CacheBackend;
pub use cache_entry::CacheEntry;
pub use config::{RecorderConfig, DEFAULT_HIDDEN_PREFIXES};
pub use error::{CacheError, CacheResult};
pub use ledger::{Ledger, Ticket};
pub use locmem::{LocMemBuilder, LocMemCache};
pub use operation::Operation;
pub use proxy::{CacheProxy, Instrumented};
pub use record::{CallKey, CallRecord, Lookup};
pub use recorder::{CallSite, Recorder};
pub use stacktrace::{escape_html, render_stacktrace, StackFrame};
pub use summarize::{summarize, SUMMARY_LIMIT};
