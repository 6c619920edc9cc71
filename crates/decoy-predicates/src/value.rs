//! Helpers over the JSON value tree the evaluator operates on.
//!
//! Every request and predicate is a `serde_json::Value`; the matcher and
//! normalizer are polymorphic over that one type. This module supplies the
//! canonical serialization used as a total order on value trees, plus the
//! truthiness and text-form rules the leaf comparators share.

use std::borrow::Cow;

use serde_json::Value;

/// Deterministic serialization with record keys sorted lexicographically at
/// every depth. Two value trees are structurally equal exactly when their
/// canonical strings are equal, which also makes the string usable as a sort
/// key for order-independent sequence comparison.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_string).collect();
            format!("[{}]", rendered.join(","))
        }
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort_unstable();
            let rendered: Vec<String> = keys
                .iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).unwrap_or_default(),
                        canonical_string(&fields[key.as_str()])
                    )
                })
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
        scalar => serde_json::to_string(scalar).unwrap_or_default(),
    }
}

/// JavaScript-style truthiness: null, `false`, zero and the empty string are
/// falsy; sequences and records are always truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The text form a scalar takes inside substring and regex comparators.
/// Missing values have already been substituted with the empty string by the
/// matcher, so null renders empty here as well.
pub(crate) fn scalar_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(canonical_string(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_string_sorts_keys_at_every_depth() {
        let a = json!({"b": {"d": 1, "c": 2}, "a": [3, 4]});
        let b = json!({"a": [3, 4], "b": {"c": 2, "d": 1}});
        assert_eq!(canonical_string(&a), canonical_string(&b));
        assert_eq!(canonical_string(&a), r#"{"a":[3,4],"b":{"c":2,"d":1}}"#);
    }

    #[test]
    fn test_canonical_string_distinguishes_types() {
        assert_ne!(canonical_string(&json!(1)), canonical_string(&json!("1")));
        assert_ne!(canonical_string(&json!(null)), canonical_string(&json!("null")));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("abc")), "abc");
        assert_eq!(scalar_text(&json!(12)), "12");
        assert_eq!(scalar_text(&json!(true)), "true");
        assert_eq!(scalar_text(&json!(null)), "");
    }
}
