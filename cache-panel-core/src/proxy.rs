use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    summarize, CacheBackend, CacheResult, CallKey, CallSite, Ledger, Operation, Recorder,
    RecorderConfig,
};

/// Process-wide interception point for one cache client.
///
/// The host builds the proxy once at startup and hands it to whatever serves
/// requests. Each request then [`bind`](CacheProxy::bind)s it to that
/// request's [`Ledger`], obtaining a client with the same interface whose
/// calls are recorded.
///
/// Installing over a client that already records its calls does not wrap it
/// a second time: handles bound from such a proxy delegate without recording.
///
/// # Examples
///
/// ```
/// use cache_panel_core::{CacheBackend, CacheProxy, Ledger, LocMemCache};
/// use serde_json::json;
///
/// let proxy = CacheProxy::install(LocMemCache::new());
///
/// // per request
/// let ledger = Ledger::new();
/// let cache = proxy.bind(&ledger);
/// cache.set("greeting", json!("hello"), None).unwrap();
/// assert_eq!(cache.get("greeting", None).unwrap(), Some(json!("hello")));
/// assert_eq!(ledger.size(), 2);
/// ```
pub struct CacheProxy<C> {
    backend: Arc<C>,
    config: Arc<RecorderConfig>,
    passthrough: bool,
}

impl<C> Clone for CacheProxy<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
            passthrough: self.passthrough,
        }
    }
}

impl<C: CacheBackend> CacheProxy<C> {
    /// Installs recording over `backend` with the default [`RecorderConfig`].
    pub fn install(backend: C) -> Self {
        Self::install_with(backend, RecorderConfig::default())
    }

    /// Installs recording over `backend`.
    ///
    /// # Arguments
    ///
    /// * `backend` - The cache client the application uses
    /// * `config` - Stack capture options shared by every bound handle
    pub fn install_with(backend: C, config: RecorderConfig) -> Self {
        Self::install_shared(Arc::new(backend), config)
    }

    /// Installs over a client that other parts of the host also hold.
    pub fn install_shared(backend: Arc<C>, config: RecorderConfig) -> Self {
        let passthrough = backend.is_instrumented();
        if passthrough {
            debug!(
                backend = std::any::type_name::<C>(),
                "cache backend already instrumented, not wrapping again"
            );
        } else {
            info!(
                backend = std::any::type_name::<C>(),
                "instrumenting cache backend"
            );
        }

        Self {
            backend,
            config: Arc::new(config),
            passthrough,
        }
    }

    /// A client for one request, recording into `ledger`.
    ///
    /// Over an already instrumented client, the inner client is re-bound to
    /// `ledger` and the returned handle only delegates, so every call is
    /// still recorded exactly once and into this request's ledger.
    pub fn bind(&self, ledger: &Ledger) -> Instrumented<C> {
        if !self.passthrough {
            return Instrumented {
                backend: Arc::clone(&self.backend),
                recorder: Some(Recorder::new(ledger.clone(), Arc::clone(&self.config))),
            };
        }

        let backend = match C::rebind(&self.backend, ledger) {
            Some(rebound) => Arc::new(rebound),
            None => {
                warn!(
                    backend = std::any::type_name::<C>(),
                    "instrumented cache backend cannot be re-bound, calls keep their original ledger"
                );
                Arc::clone(&self.backend)
            }
        };
        Instrumented {
            backend,
            recorder: None,
        }
    }

    /// The original, unrecorded client.
    pub fn backend(&self) -> &Arc<C> {
        &self.backend
    }

    /// Whether installation found the client already instrumented.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }
}

/// A cache client whose calls are appended to a request's ledger.
///
/// Every operation except `clear` is recorded. Results and errors of the
/// wrapped client come back unchanged.
pub struct Instrumented<C> {
    backend: Arc<C>,
    recorder: Option<Recorder>,
}

impl<C> Clone for Instrumented<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            recorder: self.recorder.clone(),
        }
    }
}

impl<C> Instrumented<C> {
    /// The ledger this client records into, `None` for a passthrough handle.
    pub fn ledger(&self) -> Option<&Ledger> {
        self.recorder.as_ref().map(Recorder::ledger)
    }
}

/// Positional arguments after the key, as they appear in the summary.
#[derive(Serialize)]
#[serde(untagged)]
enum Arg<'a, V> {
    Value(&'a V),
    Seconds(f64),
    Delta(i64),
}

fn summarize_args<V: Serialize>(args: &[Arg<'_, V>]) -> String {
    summarize(args)
}

fn with_timeout<'a, V>(mut args: Vec<Arg<'a, V>>, timeout: Option<Duration>) -> Vec<Arg<'a, V>> {
    if let Some(timeout) = timeout {
        args.push(Arg::Seconds(timeout.as_secs_f64()));
    }
    args
}

fn never_miss<T>(_: &T) -> bool {
    false
}

impl<C: CacheBackend> CacheBackend for Instrumented<C> {
    type Value = C::Value;

    fn add(&self, key: &str, value: Self::Value, timeout: Option<Duration>) -> CacheResult<bool> {
        let Some(recorder) = &self.recorder else {
            return self.backend.add(key, value, timeout);
        };
        let args = summarize_args(&with_timeout(vec![Arg::Value(&value)], timeout));
        recorder.record(
            CallSite::new(Operation::Add, key, args),
            || self.backend.add(key, value, timeout),
            never_miss,
        )
    }

    fn get(&self, key: &str, default: Option<Self::Value>) -> CacheResult<Option<Self::Value>> {
        let Some(recorder) = &self.recorder else {
            return self.backend.get(key, default);
        };
        let args = summarize_args(&default.iter().map(Arg::Value).collect::<Vec<_>>());
        let expected = default.clone();
        recorder.record(
            CallSite::new(Operation::Get, key, args),
            || self.backend.get(key, default),
            |found| found.is_none() || *found == expected,
        )
    }

    fn set(&self, key: &str, value: Self::Value, timeout: Option<Duration>) -> CacheResult<()> {
        let Some(recorder) = &self.recorder else {
            return self.backend.set(key, value, timeout);
        };
        let args = summarize_args(&with_timeout(vec![Arg::Value(&value)], timeout));
        recorder.record(
            CallSite::new(Operation::Set, key, args),
            || self.backend.set(key, value, timeout),
            never_miss,
        )
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        let Some(recorder) = &self.recorder else {
            return self.backend.delete(key);
        };
        recorder.record(
            CallSite::new(Operation::Delete, key, summarize_args::<C::Value>(&[])),
            || self.backend.delete(key),
            never_miss,
        )
    }

    fn get_many(&self, keys: &[&str]) -> CacheResult<BTreeMap<String, Self::Value>> {
        let Some(recorder) = &self.recorder else {
            return self.backend.get_many(keys);
        };
        // a mapping, even an empty one, is never "nothing": always a hit
        recorder.record(
            CallSite::new(
                Operation::GetMany,
                CallKey::many(keys.iter().copied()),
                summarize_args::<C::Value>(&[]),
            ),
            || self.backend.get_many(keys),
            never_miss,
        )
    }

    fn set_many(
        &self,
        entries: BTreeMap<String, Self::Value>,
        timeout: Option<Duration>,
    ) -> CacheResult<Vec<String>> {
        let Some(recorder) = &self.recorder else {
            return self.backend.set_many(entries, timeout);
        };
        let key = CallKey::many(entries.keys().cloned());
        let args = summarize_args::<C::Value>(&with_timeout(Vec::new(), timeout));
        recorder.record(
            CallSite::new(Operation::SetMany, key, args),
            || self.backend.set_many(entries, timeout),
            never_miss,
        )
    }

    fn delete_many(&self, keys: &[&str]) -> CacheResult<()> {
        let Some(recorder) = &self.recorder else {
            return self.backend.delete_many(keys);
        };
        recorder.record(
            CallSite::new(
                Operation::DeleteMany,
                CallKey::many(keys.iter().copied()),
                summarize_args::<C::Value>(&[]),
            ),
            || self.backend.delete_many(keys),
            never_miss,
        )
    }

    fn incr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let Some(recorder) = &self.recorder else {
            return self.backend.incr(key, delta);
        };
        recorder.record(
            CallSite::new(Operation::Incr, key, summarize_args::<C::Value>(&[Arg::Delta(delta)])),
            || self.backend.incr(key, delta),
            never_miss,
        )
    }

    fn decr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let Some(recorder) = &self.recorder else {
            return self.backend.decr(key, delta);
        };
        recorder.record(
            CallSite::new(Operation::Decr, key, summarize_args::<C::Value>(&[Arg::Delta(delta)])),
            || self.backend.decr(key, delta),
            never_miss,
        )
    }

    fn has_key(&self, key: &str) -> CacheResult<bool> {
        let Some(recorder) = &self.recorder else {
            return self.backend.has_key(key);
        };
        recorder.record(
            CallSite::new(Operation::HasKey, key, summarize_args::<C::Value>(&[])),
            || self.backend.has_key(key),
            never_miss,
        )
    }

    fn clear(&self) -> CacheResult<()> {
        self.backend.clear()
    }

    fn is_instrumented(&self) -> bool {
        true
    }

    fn rebind(&self, ledger: &Ledger) -> Option<Self> {
        match &self.recorder {
            Some(recorder) => Some(Self {
                backend: Arc::clone(&self.backend),
                recorder: Some(recorder.for_ledger(ledger)),
            }),
            // a delegating handle: re-bind whatever records underneath
            None => {
                let inner = C::rebind(&self.backend, ledger)?;
                Some(Self {
                    backend: Arc::new(inner),
                    recorder: None,
                })
            }
        }
    }
}
