//! Narrow predicates and coercions for untrusted JSON values.
//!
//! None of these fail: anything that does not match degrades to `None`.

use serde_json::{Map, Value};

/// Borrow `value` as a JSON object.
pub fn as_record(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// Trimmed string contents, or `None` for non-strings and blank strings.
pub fn to_trimmed_string(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Numeric field as `f64`, or `None` for anything else.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
    value?.as_f64()
}

/// Raw string field, no trimming.
pub fn to_str(value: Option<&Value>) -> Option<&str> {
    value?.as_str()
}

/// User-facing text for an error.
pub fn to_error_message(error: &dyn std::error::Error) -> String {
    error.to_string()
}
