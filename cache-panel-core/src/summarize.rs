//! Compact, bounded display strings for arguments and return values.
//!
//! Values are inspected structurally through `serde_json::Value`, pretty
//! printed without indentation and squeezed onto one line.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use thiserror::Error;
use tracing::debug;

/// Maximum length, in characters, of every summary.
pub const SUMMARY_LIMIT: usize = 100;

/// Mapping key under which legacy entries stored a serialized blob that is
/// merged back into the mapping for display.
pub const LEGACY_PAYLOAD_KEY: &str = "__pickle__";

/// Emitted when not even the fallback description can be produced.
pub const PLACEHOLDER: &str = "Unable to parse";

const ELLIPSIS: &str = "...";

#[derive(Debug, Error)]
enum PayloadError {
    #[error("legacy payload is not a string")]
    NotAString,
    #[error("legacy payload does not hold a mapping")]
    NotAMapping,
    #[error("legacy payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Summarizes any serializable value into at most [`SUMMARY_LIMIT`] characters.
///
/// * A mapping holding [`LEGACY_PAYLOAD_KEY`] gets the decoded payload merged in.
/// * A one-element sequence is displayed as its single element.
/// * Whitespace runs collapse to one space; long output ends with `...`.
///
/// Never fails: anything that cannot be interpreted is replaced by an
/// `Unable to parse: ...` description, or by [`PLACEHOLDER`].
///
/// # Examples
///
/// ```
/// use cache_panel_core::summarize;
///
/// assert_eq!(summarize(&["only"]), summarize(&"only"));
/// assert_eq!(summarize(&"a  b   c"), "\"a b c\"");
///
/// let long = "x".repeat(500);
/// let shown = summarize(&long);
/// assert_eq!(shown.chars().count(), 100);
/// assert!(shown.ends_with("..."));
/// ```
pub fn summarize<T: Serialize + ?Sized>(value: &T) -> String {
    let shown = match serde_json::to_value(value) {
        Ok(value) => interpret(value),
        Err(err) => {
            debug!(error = %err, "value cannot be represented for display");
            Value::String(format!(
                "Unable to parse: {} because: {}",
                std::any::type_name::<T>(),
                err
            ))
        }
    };

    truncate(collapse_whitespace(&pretty(&shown)))
}

fn interpret(value: Value) -> Value {
    match value {
        Value::Object(map) if map.contains_key(LEGACY_PAYLOAD_KEY) => merge_legacy_payload(map),
        Value::Array(mut items) if items.len() == 1 => match items.pop() {
            Some(only) => interpret(only),
            None => Value::Array(items),
        },
        other => other,
    }
}

fn merge_legacy_payload(mut map: Map<String, Value>) -> Value {
    let original = Value::Object(map.clone());
    let payload = map.remove(LEGACY_PAYLOAD_KEY);

    match decode_payload(payload) {
        Ok(Some(extra)) => {
            map.extend(extra);
            Value::Object(map)
        }
        Ok(None) => Value::Object(map),
        Err(err) => {
            debug!(error = %err, "falling back to raw display of legacy entry");
            Value::String(describe_failure(&original, &err))
        }
    }
}

fn decode_payload(payload: Option<Value>) -> Result<Option<Map<String, Value>>, PayloadError> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(blob)) if blob.is_empty() => Ok(None),
        Some(Value::String(blob)) => match serde_json::from_str(&blob)? {
            Value::Object(extra) => Ok(Some(extra)),
            _ => Err(PayloadError::NotAMapping),
        },
        Some(_) => Err(PayloadError::NotAString),
    }
}

fn describe_failure(original: &Value, err: &PayloadError) -> String {
    match serde_json::to_string(original) {
        Ok(repr) => format!("Unable to parse: {} because: {}", repr, err),
        Err(_) => PLACEHOLDER.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b""));
    if value.serialize(&mut ser).is_err() {
        return PLACEHOLDER.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| PLACEHOLDER.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: String) -> String {
    if text.chars().count() <= SUMMARY_LIMIT {
        return text;
    }
    let mut short: String = text
        .chars()
        .take(SUMMARY_LIMIT - ELLIPSIS.len())
        .collect();
    short.push_str(ELLIPSIS);
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_scalars() {
        assert_eq!(summarize(&42), "42");
        assert_eq!(summarize(&"v1"), "\"v1\"");
        assert_eq!(summarize(&Option::<i32>::None), "null");
        assert_eq!(summarize(&true), "true");
    }

    #[test]
    fn test_mapping_on_one_line() {
        let shown = summarize(&json!({"a": 1, "b": [1, 2]}));
        assert_eq!(shown, r#"{ "a": 1, "b": [ 1, 2 ] }"#);
    }

    #[test]
    fn test_empty_sequence() {
        let none: [i32; 0] = [];
        assert_eq!(summarize(&none), "[]");
    }

    #[test]
    fn test_singleton_unwrapped() {
        assert_eq!(summarize(&vec![7]), "7");
        assert_eq!(summarize(&(json!({"k": "v"}),)), summarize(&json!({"k": "v"})));
        assert_eq!(summarize(&vec![1, 2]), "[ 1, 2 ]");
    }

    #[test]
    fn test_singleton_property_holds_for_nested_values() {
        let values = [
            json!([3]),
            json!([[3]]),
            json!({"__pickle__": "{\"x\": 1}"}),
            json!("s"),
            json!([1, 2, 3]),
        ];
        for value in values {
            assert_eq!(summarize(&[value.clone()]), summarize(&value));
        }
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(summarize(&"line one      line two"), "\"line one line two\"");
    }

    #[test]
    fn test_truncation_boundary() {
        // 98 characters plus two quotes: exactly at the limit
        let exact = "a".repeat(98);
        let shown = summarize(&exact);
        assert_eq!(shown.chars().count(), 100);
        assert!(!shown.ends_with("..."));

        let over = "a".repeat(99);
        let shown = summarize(&over);
        assert_eq!(shown.chars().count(), 100);
        assert!(shown.ends_with("..."));
        assert!(shown.starts_with("\"aaa"));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let wide = "é".repeat(300);
        let shown = summarize(&wide);
        assert_eq!(shown.chars().count(), 100);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn test_legacy_payload_merged() {
        let entry = json!({
            "id": 3,
            "__pickle__": "{\"name\": \"ada\", \"id\": 4}",
        });
        assert_eq!(summarize(&entry), r#"{ "id": 4, "name": "ada" }"#);
    }

    #[test]
    fn test_empty_legacy_payload_dropped() {
        assert_eq!(summarize(&json!({"a": 1, "__pickle__": null})), r#"{ "a": 1 }"#);
        assert_eq!(summarize(&json!({"a": 1, "__pickle__": ""})), r#"{ "a": 1 }"#);
    }

    #[test]
    fn test_broken_legacy_payload_falls_back() {
        let shown = summarize(&json!({"__pickle__": "not json"}));
        assert!(shown.starts_with("\"Unable to parse: "), "{shown}");
        assert!(shown.contains("because"));
        assert!(shown.chars().count() <= SUMMARY_LIMIT);

        let shown = summarize(&json!({"__pickle__": 12}));
        assert!(shown.contains("not a string"), "{shown}");

        let shown = summarize(&json!({"__pickle__": "[1, 2]"}));
        assert!(shown.contains("mapping"), "{shown}");
    }

    #[test]
    fn test_unserializable_value_falls_back() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let shown = summarize(&map);
        assert!(shown.starts_with("\"Unable to parse: "), "{shown}");
        assert!(shown.chars().count() <= SUMMARY_LIMIT);
    }

    #[test]
    fn test_output_never_exceeds_limit() {
        let mut big = BTreeMap::new();
        for i in 0..200 {
            big.insert(format!("key{i}"), vec![i; 3]);
        }
        assert!(summarize(&big).chars().count() <= SUMMARY_LIMIT);
        assert!(summarize(&vec!["x"; 1000]).chars().count() <= SUMMARY_LIMIT);
    }
}
