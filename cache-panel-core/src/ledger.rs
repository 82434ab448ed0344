use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use crate::CallRecord;

/// Ordered log of the cache calls made while serving one request.
///
/// A `Ledger` is a handle: clones share the same buffer, so the panel that
/// owns the request lifecycle and the instrumented cache handed to the
/// application code see the same records. Each request gets its own ledger,
/// which is what keeps concurrent requests apart.
///
/// # Thread Safety
///
/// The buffer sits behind a `parking_lot::Mutex`. A request that fans work out
/// to helper threads can share its ledger with them; records appear in the
/// order the calls started.
///
/// # Examples
///
/// ```
/// use cache_panel_core::Ledger;
///
/// let ledger = Ledger::new();
/// let shared = ledger.clone();
/// assert!(shared.is_empty());
///
/// ledger.reset();
/// assert_eq!(shared.size(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    calls: Arc<Mutex<Calls>>,
}

#[derive(Debug, Default)]
struct Calls {
    /// Bumped by every reset; tickets from an older generation are stale.
    generation: u64,
    next_seq: u64,
    /// Kept sorted by sequence number, i.e. by invocation order.
    records: Vec<(u64, CallRecord)>,
}

/// Position of a call in its ledger, taken when the call starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    seq: u64,
}

impl Calls {
    fn issue(&mut self) -> Ticket {
        let ticket = Ticket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        ticket
    }

    fn place(&mut self, ticket: Ticket, call: CallRecord) {
        if ticket.generation != self.generation {
            trace!(operation = %call.function, "dropping call started before the last reset");
            return;
        }
        let pos = self.records.partition_point(|(seq, _)| *seq < ticket.seq);
        self.records.insert(pos, (ticket.seq, call));
    }
}

impl Ledger {
    /// Creates an empty ledger.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_panel_core::Ledger;
    ///
    /// let ledger = Ledger::new();
    /// assert!(ledger.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every record. Called once at the start of each request.
    ///
    /// Calls still in flight when the ledger is reset belong to the previous
    /// request and are discarded when they finish.
    pub fn reset(&self) {
        let mut calls = self.calls.lock();
        calls.records.clear();
        calls.generation += 1;
        calls.next_seq = 0;
    }

    /// Appends a finished call after every call started so far.
    ///
    /// # Arguments
    ///
    /// * `call` - The record to store
    pub fn append(&self, call: CallRecord) {
        let mut calls = self.calls.lock();
        let ticket = calls.issue();
        calls.place(ticket, call);
    }

    /// Reserves the position of a call that is about to run.
    ///
    /// Records are ordered by the moment their call started, not by when
    /// they were [`finish`](Self::finish)ed, so a call that makes nested
    /// cache calls is listed before them.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_panel_core::Ledger;
    ///
    /// let ledger = Ledger::new();
    /// let outer = ledger.begin();
    /// let inner = ledger.begin();
    /// assert_ne!(outer, inner);
    /// ```
    pub fn begin(&self) -> Ticket {
        self.calls.lock().issue()
    }

    /// Stores the record of a call started with [`begin`](Self::begin).
    ///
    /// The record is dropped if the ledger was reset in between.
    pub fn finish(&self, ticket: Ticket, call: CallRecord) {
        self.calls.lock().place(ticket, call);
    }

    /// Snapshot of the records in invocation order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls
            .lock()
            .records
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Number of recorded calls.
    pub fn size(&self) -> usize {
        self.calls.lock().records.len()
    }

    /// Returns `true` when no call has been recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().records.is_empty()
    }

    /// The most recently invoked call.
    pub fn last(&self) -> Option<CallRecord> {
        self.calls.lock().records.last().map(|(_, call)| call.clone())
    }

    /// Sum of recorded durations in milliseconds.
    pub fn total_duration(&self) -> f64 {
        self.calls
            .lock()
            .records
            .iter()
            .map(|(_, call)| call.duration)
            .sum()
    }

    /// Whether two handles point at the same buffer.
    pub fn same_as(&self, other: &Ledger) -> bool {
        Arc::ptr_eq(&self.calls, &other.calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Operation;
    use chrono::Local;

    fn call(op: Operation, duration: f64) -> CallRecord {
        let mut rec = CallRecord::new(op, "k".into(), "[]".into(), String::new(), Local::now());
        rec.duration = duration;
        rec
    }

    #[test]
    fn test_append_keeps_order() {
        let ledger = Ledger::new();
        ledger.append(call(Operation::Get, 1.0));
        ledger.append(call(Operation::Set, 2.0));
        ledger.append(call(Operation::Delete, 0.5));

        let ops: Vec<_> = ledger.calls().iter().map(|c| c.function).collect();
        assert_eq!(ops, vec![Operation::Get, Operation::Set, Operation::Delete]);
        assert_eq!(ledger.last().map(|c| c.function), Some(Operation::Delete));
        assert!((ledger.total_duration() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_clears_everything() {
        let ledger = Ledger::new();
        for _ in 0..5 {
            ledger.append(call(Operation::Get, 1.0));
        }
        assert_eq!(ledger.size(), 5);

        ledger.reset();
        assert_eq!(ledger.size(), 0);
        assert!(ledger.last().is_none());
        assert_eq!(ledger.total_duration(), 0.0);
    }

    #[test]
    fn test_clones_share_buffer() {
        let ledger = Ledger::new();
        let handle = ledger.clone();
        handle.append(call(Operation::Incr, 1.0));

        assert_eq!(ledger.size(), 1);
        assert!(ledger.same_as(&handle));
        assert!(!ledger.same_as(&Ledger::new()));
    }

    #[test]
    fn test_records_ordered_by_start() {
        let ledger = Ledger::new();
        let outer = ledger.begin();
        let first_inner = ledger.begin();
        let second_inner = ledger.begin();

        // inner calls finish before the call that made them
        ledger.finish(first_inner, call(Operation::HasKey, 1.0));
        ledger.finish(second_inner, call(Operation::Get, 1.0));
        ledger.finish(outer, call(Operation::Get, 3.0));

        let ops: Vec<_> = ledger.calls().iter().map(|c| c.function).collect();
        assert_eq!(ops, vec![Operation::Get, Operation::HasKey, Operation::Get]);
        assert_eq!(ledger.last().map(|c| c.function), Some(Operation::Get));
        assert!((ledger.last().unwrap().duration - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_call_started_before_reset_is_dropped() {
        let ledger = Ledger::new();
        let stale = ledger.begin();
        ledger.reset();

        let fresh = ledger.begin();
        ledger.finish(stale, call(Operation::Set, 1.0));
        ledger.finish(fresh, call(Operation::Delete, 1.0));

        let ops: Vec<_> = ledger.calls().iter().map(|c| c.function).collect();
        assert_eq!(ops, vec![Operation::Delete]);
    }

    #[test]
    fn test_concurrent_appends() {
        use std::thread;

        let ledger = Ledger::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        ledger.append(call(Operation::Get, 0.1));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.size(), 200);
    }
}
