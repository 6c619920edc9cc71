//! Scalar transforms composed by the normalizer.
//!
//! Each transform is a small `&str -> String` (or value-tree) function; the
//! normalizer applies them in a fixed order to both sides of a comparison.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::PredicateError;
use crate::normalize;
use crate::options::PredicateConfig;

/// Unicode-aware lower-case fold.
pub(crate) fn lowercase(s: &str) -> String {
    s.to_lowercase()
}

/// Compile the predicate's `except` strip pattern, if any. Matches are
/// removed globally; case is ignored when the predicate's values are.
pub(crate) fn compile_except(config: &PredicateConfig) -> Result<Option<Regex>, PredicateError> {
    let Some(pattern) = config.except.as_deref() else {
        return Ok(None);
    };
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(!config.case_sensitive)
        .build()
        .map_err(|e| {
            PredicateError::validation(
                format!("invalid except pattern: {e}"),
                Value::String(pattern.to_string()),
            )
        })?;
    Ok(Some(regex))
}

pub(crate) fn strip_except(s: &str, except: Option<&Regex>) -> String {
    match except {
        Some(regex) => regex.replace_all(s, "").into_owned(),
        None => s.to_string(),
    }
}

/// Standard-alphabet base64 decode, reinterpreted as UTF-8 text. Values that
/// do not decode pass through unchanged.
pub(crate) fn decode_base64(s: &str) -> String {
    match BASE64.decode(s) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => s.to_string(),
    }
}

/// Deep coercion of every scalar to its string form. Only `deepEquals`
/// compares through this, so `1` and `"1"` are equal there and nowhere else.
pub(crate) fn force_strings(value: &Value) -> Value {
    match value {
        Value::Null => Value::String("null".to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::String(_) => value.clone(),
        Value::Array(items) => Value::Array(items.iter().map(force_strings).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, field)| (key.clone(), force_strings(field)))
                .collect(),
        ),
    }
}

/// Attempt to parse a string as JSON. On success the parsed tree runs
/// through the key-fold, except and case transforms (never the array sort,
/// which would invalidate indexed selectors like `$..title[1]`). Parse
/// failures yield the string unchanged.
pub(crate) fn try_json(s: &str, config: &PredicateConfig) -> Result<Value, PredicateError> {
    match serde_json::from_str::<Value>(s) {
        Ok(parsed) => normalize::transform_parsed(&parsed, config),
        Err(_) => Ok(Value::String(s.to_string())),
    }
}
