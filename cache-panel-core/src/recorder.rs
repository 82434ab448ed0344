use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::{
    summarize, CacheResult, CallKey, CallRecord, Ledger, Lookup, Operation, RecorderConfig, Ticket,
};

/// What is known about a call before it runs.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub operation: Operation,
    pub key: CallKey,
    /// Summary of the arguments after the key.
    pub args: String,
}

impl CallSite {
    pub fn new(operation: Operation, key: impl Into<CallKey>, args: String) -> Self {
        Self {
            operation,
            key: key.into(),
            args,
        }
    }
}

/// Times and classifies cache calls, appending one [`CallRecord`] per call to
/// its ledger.
///
/// The recorder is a side channel: the value or error produced by the wrapped
/// operation is returned untouched.
///
/// # Examples
///
/// ```
/// use cache_panel_core::{CallSite, Ledger, Operation, Recorder};
///
/// let ledger = Ledger::new();
/// let recorder = Recorder::new(ledger.clone(), Default::default());
///
/// let found: Option<i32> = recorder
///     .record(
///         CallSite::new(Operation::Get, "answer", "[]".to_string()),
///         || Ok(None),
///         |value: &Option<i32>| value.is_none(),
///     )
///     .unwrap();
///
/// assert_eq!(found, None);
/// assert_eq!(ledger.size(), 1);
/// assert_eq!(ledger.last().unwrap().misses(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Recorder {
    ledger: Ledger,
    config: Arc<RecorderConfig>,
}

impl Recorder {
    /// Creates a recorder appending to `ledger`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - The request's call log
    /// * `config` - Stack capture options, usually shared by every request
    pub fn new(ledger: Ledger, config: Arc<RecorderConfig>) -> Self {
        Self { ledger, config }
    }

    /// The ledger calls are recorded into.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Same configuration, recording into another ledger.
    pub fn for_ledger(&self, ledger: &Ledger) -> Self {
        Self::new(ledger.clone(), Arc::clone(&self.config))
    }

    /// Runs `invoke`, recording it under `site`.
    ///
    /// For read operations `is_miss` decides the classification of a
    /// successful result; a failed (or panicking) read counts as a miss.
    /// The record is appended even when `invoke` fails or panics.
    pub fn record<T, F, M>(&self, site: CallSite, invoke: F, is_miss: M) -> CacheResult<T>
    where
        T: Serialize,
        F: FnOnce() -> CacheResult<T>,
        M: FnOnce(&T) -> bool,
    {
        let operation = site.operation;
        let mut call = InFlight::begin(&self.ledger, site, self.stacktrace());

        let result = invoke();
        call.stop();

        match &result {
            Ok(value) => {
                if operation.is_read() {
                    call.classify(if is_miss(value) {
                        Lookup::Miss
                    } else {
                        Lookup::Hit
                    });
                }
                call.set_value(summarize(value));
            }
            Err(err) => debug!(%operation, error = %err, "cache operation failed"),
        }

        result
    }

    #[cfg(feature = "stacktrace")]
    fn stacktrace(&self) -> String {
        crate::render_stacktrace(&crate::stacktrace::capture(&self.config))
    }

    #[cfg(not(feature = "stacktrace"))]
    fn stacktrace(&self) -> String {
        String::new()
    }
}

/// A call that has started. Its place in the ledger is reserved up front;
/// dropping it stores the record, so the ledger sees the call even if the
/// operation unwinds.
struct InFlight<'a> {
    ledger: &'a Ledger,
    ticket: Ticket,
    record: Option<CallRecord>,
    timer: Instant,
    stopped: bool,
}

impl<'a> InFlight<'a> {
    fn begin(ledger: &'a Ledger, site: CallSite, stacktrace: String) -> Self {
        let record = CallRecord::new(site.operation, site.key, site.args, stacktrace, Local::now());
        Self {
            ledger,
            ticket: ledger.begin(),
            record: Some(record),
            timer: Instant::now(),
            stopped: false,
        }
    }

    fn stop(&mut self) {
        let duration = elapsed_ms(self.timer);
        if let Some(record) = self.record.as_mut() {
            record.duration = duration;
        }
        self.stopped = true;
    }

    fn classify(&mut self, lookup: Lookup) {
        if let Some(record) = self.record.as_mut() {
            record.classify(lookup);
        }
    }

    fn set_value(&mut self, value: String) {
        if let Some(record) = self.record.as_mut() {
            record.value = Some(value);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Some(mut record) = self.record.take() else {
            return;
        };
        if !self.stopped {
            record.duration = elapsed_ms(self.timer);
        }
        if record.function.is_read() && record.lookup().is_none() {
            record.classify(Lookup::Miss);
        }
        trace!(
            operation = %record.function,
            duration_ms = record.duration,
            "recorded cache call"
        );
        self.ledger.finish(self.ticket, record);
    }
}

fn elapsed_ms(timer: Instant) -> f64 {
    timer.elapsed().as_secs_f64() * 1000.0
}
