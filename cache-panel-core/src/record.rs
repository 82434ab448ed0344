use chrono::{DateTime, Local};
use serde::Serialize;

use crate::Operation;

/// The key argument of an intercepted call.
///
/// Single-key operations record the key itself; bulk operations record the
/// key set (for `set_many`, the keys of the mapping being stored).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallKey {
    Single(String),
    Many(Vec<String>),
}

impl CallKey {
    pub fn many<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CallKey::Many(keys.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for CallKey {
    fn from(key: &str) -> Self {
        CallKey::Single(key.to_string())
    }
}

/// Hit/miss classification of a read operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

/// One intercepted cache operation.
///
/// Built by the [`Recorder`](crate::Recorder) while the call is in flight and
/// appended to the [`Ledger`](crate::Ledger) once it completes; never changed
/// afterwards.
///
/// Only read operations (`get`, `get_many`) carry a hit or miss flag. The
/// serialized form omits the absent flag entirely, as well as `value` when
/// the operation failed.
///
/// # Fields
///
/// * `function` - The operation name
/// * `args` - Summary of the positional arguments after the key
/// * `key` - The key or key set the call addressed
/// * `stacktrace` - HTML-formatted stack of the calling code
/// * `start` - Wall clock time the call began
/// * `duration` - Elapsed time in milliseconds
/// * `value` - Summary of the returned value
#[derive(Clone, Debug, Serialize)]
pub struct CallRecord {
    pub function: Operation,
    pub args: String,
    pub key: CallKey,
    pub stacktrace: String,
    pub start: DateTime<Local>,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    hit: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    miss: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CallRecord {
    pub(crate) fn new(
        function: Operation,
        key: CallKey,
        args: String,
        stacktrace: String,
        start: DateTime<Local>,
    ) -> Self {
        Self {
            function,
            args,
            key,
            stacktrace,
            start,
            duration: 0.0,
            hit: None,
            miss: None,
            value: None,
        }
    }

    pub(crate) fn classify(&mut self, lookup: Lookup) {
        match lookup {
            Lookup::Hit => {
                self.hit = Some(1);
                self.miss = None;
            }
            Lookup::Miss => {
                self.hit = None;
                self.miss = Some(1);
            }
        }
    }

    /// The classification, `None` for operations that are not reads.
    pub fn lookup(&self) -> Option<Lookup> {
        match (self.hit, self.miss) {
            (Some(_), _) => Some(Lookup::Hit),
            (_, Some(_)) => Some(Lookup::Miss),
            _ => None,
        }
    }

    /// Hit flag as a count (1 or 0) for aggregation.
    #[inline]
    pub fn hits(&self) -> u64 {
        u64::from(self.hit.unwrap_or(0))
    }

    /// Miss flag as a count (1 or 0) for aggregation.
    #[inline]
    pub fn misses(&self) -> u64 {
        u64::from(self.miss.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(op: Operation) -> CallRecord {
        CallRecord::new(op, "k".into(), "[]".into(), String::new(), Local::now())
    }

    #[test]
    fn test_unclassified_by_default() {
        let rec = record(Operation::Set);
        assert_eq!(rec.lookup(), None);
        assert_eq!(rec.hits(), 0);
        assert_eq!(rec.misses(), 0);
    }

    #[test]
    fn test_classify_is_exclusive() {
        let mut rec = record(Operation::Get);
        rec.classify(Lookup::Hit);
        rec.classify(Lookup::Miss);
        assert_eq!(rec.lookup(), Some(Lookup::Miss));
        assert_eq!(rec.hits(), 0);
        assert_eq!(rec.misses(), 1);
    }

    #[test]
    fn test_serialized_flags_only_when_present() {
        let mut rec = record(Operation::Get);
        rec.classify(Lookup::Hit);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["hit"], 1);
        assert!(json.get("miss").is_none());
        assert!(json.get("value").is_none());
        assert_eq!(json["function"], "get");
        assert_eq!(json["key"], "k");

        let json = serde_json::to_value(record(Operation::Delete)).unwrap();
        assert!(json.get("hit").is_none());
        assert!(json.get("miss").is_none());
    }

    #[test]
    fn test_key_set_serializes_as_list() {
        let key = CallKey::many(["a", "b"]);
        assert_eq!(serde_json::to_string(&key).unwrap(), r#"["a","b"]"#);
    }
}
