//! JSON conversion for query values.
//!
//! Values convert to and from [`serde_json::Value`]. Keyed sequences print as
//! JSON arrays when their keys are exactly `0..n`, and as objects otherwise
//! (keys rendered with [`Value::to_display_string`]).
//!
//! # Examples
//!
//! ```
//! use fluent_query::{Sequence, Value};
//! use fluent_query::output::to_json;
//!
//! assert_eq!(to_json(&Value::Integer(42)), "42");
//! let seq = Sequence::from_values(vec![1, 2]);
//! assert_eq!(to_json(&Value::Sequence(seq)), "[1,2]");
//! ```

use crate::value::Value;

/// Convert serde_json::Value to a query Value
pub fn from_json(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

/// Convert a query Value to serde_json::Value
pub fn into_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(into_json).collect()),
        Value::Object(obj) => serde_json::Value::Object(
            obj.iter().map(|(k, v)| (k.clone(), into_json(v))).collect(),
        ),
        Value::Sequence(seq) if seq.is_list() => {
            serde_json::Value::Array(seq.values().map(into_json).collect())
        }
        Value::Sequence(seq) => serde_json::Value::Object(
            seq.iter()
                .map(|(k, v)| (k.to_display_string(), into_json(v)))
                .collect(),
        ),
    }
}

/// Compact JSON text.
pub fn to_json(value: &Value) -> String {
    into_json(value).to_string()
}

/// JSON text with 2-space indentation.
pub fn to_json_pretty(value: &Value) -> String {
    let json = into_json(value);
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}
