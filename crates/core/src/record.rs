//! Input records and value coercion
//!
//! A request body is a single flat JSON object keyed by the raw column names
//! the model was trained on. Values arrive as strings, numbers, booleans or
//! nulls; the two coercions below decide how each reaches the encoder and
//! model stages.

use crate::errors::RequestError;
use serde_json::Value;

/// One inbound patient record: raw column name -> value.
pub type InputRecord = serde_json::Map<String, Value>;

/// String form of a value, as seen by the label encoders.
///
/// Strings pass through untouched; numbers and booleans render as their
/// canonical JSON text (`1`, `1.5`, `true`); null renders as `"none"`.
/// The stored encoder vocabularies are written against this same rule.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "none".to_string(),
        other => other.to_string(),
    }
}

/// Numeric form of a value for a column that has no encoder.
///
/// Booleans count as 0/1. Anything else is a request error naming the
/// offending column so the caller sees which part of the payload is off.
pub fn value_to_f64(column: &str, value: &Value) -> Result<f64, RequestError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| RequestError::NonNumeric {
            column: column.to_string(),
            value: n.to_string(),
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(RequestError::NonNumeric {
            column: column.to_string(),
            value: value_to_string(other),
        }),
    }
}
