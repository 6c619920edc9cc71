//! The structural matcher walking expected against actual.
//!
//! Both sides arrive normalized. The walk descends through the expected
//! shape: every expected field must be satisfied by the corresponding actual
//! field, with special-cased semantics when one or both sides are sequences
//! and recursive descent into nested records. String-valued actual fields
//! are lazily re-parsed as JSON so predicates can reach into bodies carried
//! as strings. Every mismatch is a plain `false`, never an error.

use serde_json::Value;

use crate::error::PredicateError;
use crate::options::PredicateConfig;
use crate::transforms::try_json;
use crate::value::is_truthy;

/// Operator-specific scalar comparison, run at the leaves of the walk.
pub(crate) type LeafFn = dyn Fn(&Value, &Value) -> Result<bool, PredicateError>;

pub(crate) struct MatchContext<'a> {
    pub config: &'a PredicateConfig,
    /// The `exists` operator short-circuits on multi-valued actual fields.
    pub exists_operator: bool,
}

/// Does `actual` satisfy the `expected` shape under the given leaf test?
pub(crate) fn predicate_satisfied(
    expected: &Value,
    actual: &Value,
    ctx: &MatchContext<'_>,
    leaf: &LeafFn,
) -> Result<bool, PredicateError> {
    if !is_truthy(actual) {
        return Ok(false);
    }

    // Reach into fields carried as JSON-encoded strings (e.g. HTTP bodies).
    let reparsed;
    let actual = match actual {
        Value::String(s) => {
            reparsed = try_json(s, ctx.config)?;
            &reparsed
        }
        other => other,
    };

    let Some(expected_fields) = expected.as_object() else {
        // Scalar (or sequence) expected: no fields to walk.
        return match (expected, actual) {
            (Value::Array(want), Value::Array(have)) => every_matches_some(want, have, ctx, leaf),
            _ => test_predicate(expected, Some(actual), ctx, leaf),
        };
    };

    for (field, expected_field) in expected_fields {
        if !field_satisfied(field, expected_field, actual, ctx, leaf)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Entry point for a single comparison: undefined actual becomes the empty
/// string, record-shaped expected recurses, scalars hit the leaf test.
pub(crate) fn test_predicate(
    expected: &Value,
    actual: Option<&Value>,
    ctx: &MatchContext<'_>,
    leaf: &LeafFn,
) -> Result<bool, PredicateError> {
    let empty = Value::String(String::new());
    let actual = match actual {
        None | Some(Value::Null) => &empty,
        Some(defined) => defined,
    };
    if expected.is_object() {
        predicate_satisfied(expected, actual, ctx, leaf)
    } else {
        leaf(expected, actual)
    }
}

fn field_satisfied(
    field: &str,
    expected: &Value,
    actual_parent: &Value,
    ctx: &MatchContext<'_>,
    leaf: &LeafFn,
) -> Result<bool, PredicateError> {
    let actual = actual_parent.get(field);

    // Both sequences: every expected element must match some actual element.
    if let (Value::Array(want), Some(Value::Array(have))) = (expected, actual) {
        return every_matches_some(want, have, ctx, leaf);
    }

    // Only the actual side is a sequence.
    if let Some(Value::Array(have)) = actual {
        if ctx.exists_operator && is_truthy(expected) {
            return Ok(true);
        }
        return any_matches(expected, have, ctx, leaf);
    }

    // Predicates written before the array syntax existed: a scalar/record
    // field against a sequence-of-records actual matches any element.
    if actual.is_none() && !expected.is_array() {
        if let Value::Array(elements) = actual_parent {
            let mut single = serde_json::Map::new();
            single.insert(field.to_string(), expected.clone());
            let wrapped = Value::Object(single);
            for element in elements {
                if predicate_satisfied(&wrapped, element, ctx, leaf)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
    }

    if expected.is_object() {
        return predicate_satisfied(expected, actual.unwrap_or(&Value::Null), ctx, leaf);
    }

    test_predicate(expected, actual, ctx, leaf)
}

fn every_matches_some(
    want: &[Value],
    have: &[Value],
    ctx: &MatchContext<'_>,
    leaf: &LeafFn,
) -> Result<bool, PredicateError> {
    for expected in want {
        if !any_matches(expected, have, ctx, leaf)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_matches(
    expected: &Value,
    have: &[Value],
    ctx: &MatchContext<'_>,
    leaf: &LeafFn,
) -> Result<bool, PredicateError> {
    for candidate in have {
        if test_predicate(expected, Some(candidate), ctx, leaf)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::canonical_string;
    use serde_json::json;

    fn ctx(config: &PredicateConfig) -> MatchContext<'_> {
        MatchContext {
            config,
            exists_operator: false,
        }
    }

    fn equals_leaf(expected: &Value, actual: &Value) -> Result<bool, PredicateError> {
        Ok(canonical_string(expected) == canonical_string(actual))
    }

    fn satisfied(expected: Value, actual: Value) -> bool {
        let config = PredicateConfig::default();
        predicate_satisfied(&expected, &actual, &ctx(&config), &equals_leaf).unwrap()
    }

    #[test]
    fn test_scalar_fields() {
        assert!(satisfied(json!({"method": "get"}), json!({"method": "get", "path": "/"})));
        assert!(!satisfied(json!({"method": "get"}), json!({"method": "post"})));
    }

    #[test]
    fn test_missing_field_compares_as_empty_string() {
        assert!(satisfied(json!({"query": ""}), json!({"method": "get"})));
        assert!(!satisfied(json!({"query": "x"}), json!({"method": "get"})));
    }

    #[test]
    fn test_nested_records_recurse() {
        assert!(satisfied(
            json!({"headers": {"accept": "text/html"}}),
            json!({"headers": {"accept": "text/html", "host": "x"}})
        ));
        assert!(!satisfied(
            json!({"headers": {"accept": "text/html"}}),
            json!({"headers": {"host": "x"}})
        ));
    }

    #[test]
    fn test_both_sequences_use_subset_semantics() {
        let actual = json!({"accept": ["text/html", "application/json"]});
        assert!(satisfied(json!({"accept": ["application/json"]}), actual.clone()));
        assert!(satisfied(
            json!({"accept": ["application/json", "text/html"]}),
            actual.clone()
        ));
        assert!(!satisfied(json!({"accept": ["application/xml"]}), actual));
    }

    #[test]
    fn test_scalar_against_sequence_matches_any_element() {
        let actual = json!({"accept": ["text/html", "application/json"]});
        assert!(satisfied(json!({"accept": "text/html"}), actual.clone()));
        assert!(!satisfied(json!({"accept": "application/xml"}), actual));
    }

    #[test]
    fn test_string_actual_reparses_as_json() {
        assert!(satisfied(
            json!({"body": {"name": "bob"}}),
            json!({"body": r#"{"name":"bob"}"#})
        ));
        assert!(!satisfied(
            json!({"body": {"name": "alice"}}),
            json!({"body": r#"{"name":"bob"}"#})
        ));
    }

    #[test]
    fn test_pre_array_syntax_predicates_match_sequence_elements() {
        let actual = json!({"body": r#"[{"key":"first"},{"key":"second"}]"#});
        assert!(satisfied(json!({"body": {"key": "second"}}), actual.clone()));
        assert!(!satisfied(json!({"body": {"key": "third"}}), actual));
    }

    #[test]
    fn test_exists_operator_short_circuits_on_sequences() {
        let config = PredicateConfig::default();
        let exists_ctx = MatchContext {
            config: &config,
            exists_operator: true,
        };
        let satisfied = predicate_satisfied(
            &json!({"tags": true}),
            &json!({"tags": ["x"]}),
            &exists_ctx,
            &equals_leaf,
        )
        .unwrap();
        assert!(satisfied);
    }

    #[test]
    fn test_falsy_actual_never_matches() {
        assert!(!satisfied(json!({"a": "b"}), json!(null)));
        assert!(!satisfied(json!({"a": "b"}), json!("")));
    }
}
