//! Top-level predicate dispatch and the boolean combinators.

use serde_json::Value;
use tracing::debug;

use crate::error::PredicateError;
use crate::inject;
use crate::operators;
use crate::options::Encoding;

/// Operator keys recognized at the top level of a predicate record.
const OPERATORS: &[&str] = &[
    "equals",
    "deepEquals",
    "contains",
    "startsWith",
    "endsWith",
    "matches",
    "exists",
    "not",
    "or",
    "and",
    "inject",
];

/// Decide whether `request` satisfies `predicate`.
///
/// The first key of the predicate record that names a known operator picks
/// the operator (well-formed predicates carry exactly one). A predicate with
/// no operator key is a validation error carrying the offending predicate.
/// `imposter_state` is an opaque mutable record handed only to `inject`.
pub fn evaluate(
    predicate: &Value,
    request: &Value,
    encoding: Encoding,
    imposter_state: &mut Value,
) -> Result<bool, PredicateError> {
    let fields = predicate
        .as_object()
        .ok_or_else(|| PredicateError::validation("missing predicate", predicate.clone()))?;
    let (operator, operand) = fields
        .iter()
        .map(|(key, operand)| (key.as_str(), operand))
        .find(|(key, _)| OPERATORS.contains(key))
        .ok_or_else(|| PredicateError::validation("missing predicate", predicate.clone()))?;

    debug!(operator, "evaluating predicate");

    match operator {
        "equals" => operators::equals(predicate, operand, request, encoding),
        "deepEquals" => operators::deep_equals(predicate, operand, request, encoding),
        "contains" => operators::contains(predicate, operand, request, encoding),
        "startsWith" => operators::starts_with(predicate, operand, request, encoding),
        "endsWith" => operators::ends_with(predicate, operand, request, encoding),
        "matches" => operators::matches(predicate, operand, request, encoding),
        "exists" => operators::exists(predicate, operand, request, encoding),
        "not" => Ok(!evaluate(operand, request, encoding, imposter_state)?),
        "or" => any(predicate, operand, request, encoding, imposter_state),
        "and" => all(predicate, operand, request, encoding, imposter_state),
        "inject" => inject::inject(operand, request, imposter_state),
        _ => Err(PredicateError::validation("missing predicate", predicate.clone())),
    }
}

fn clauses<'a>(
    predicate: &Value,
    operand: &'a Value,
    operator: &str,
) -> Result<&'a Vec<Value>, PredicateError> {
    operand.as_array().ok_or_else(|| {
        PredicateError::validation(
            format!("the {operator} predicate must be an array"),
            predicate.clone(),
        )
    })
}

fn any(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
    imposter_state: &mut Value,
) -> Result<bool, PredicateError> {
    for clause in clauses(predicate, operand, "or")? {
        if evaluate(clause, request, encoding, imposter_state)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn all(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
    imposter_state: &mut Value,
) -> Result<bool, PredicateError> {
    for clause in clauses(predicate, operand, "and")? {
        if !evaluate(clause, request, encoding, imposter_state)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(predicate: Value, request: Value) -> bool {
        let mut state = json!({});
        evaluate(&predicate, &request, Encoding::Utf8, &mut state).unwrap()
    }

    #[test]
    fn test_unknown_predicate_is_a_validation_error() {
        let mut state = json!({});
        let err = evaluate(
            &json!({"bogus": {"path": "/"}}),
            &json!({"path": "/"}),
            Encoding::Utf8,
            &mut state,
        )
        .unwrap_err();
        match err {
            PredicateError::Validation { message, subject } => {
                assert_eq!(message, "missing predicate");
                assert_eq!(subject, json!({"bogus": {"path": "/"}}));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_sibling_keys_are_tolerated() {
        assert!(eval(
            json!({"equals": {"path": "/"}, "comment": "note"}),
            json!({"path": "/"})
        ));
    }

    #[test]
    fn test_first_recognized_operator_key_wins() {
        // predicates with two operator keys resolve to the first in record order
        let request = json!({"m": "GET"});

        let equals_first = json!({"equals": {"m": "GET"}, "contains": {"m": "nonsense"}});
        assert!(eval(equals_first, request.clone()));

        let contains_first = json!({"contains": {"m": "nonsense"}, "equals": {"m": "GET"}});
        assert!(!eval(contains_first, request));
    }

    #[test]
    fn test_not_negates() {
        assert!(!eval(json!({"not": {"equals": {"m": "get"}}}), json!({"m": "GET"})));
        assert!(eval(json!({"not": {"equals": {"m": "post"}}}), json!({"m": "GET"})));
    }

    #[test]
    fn test_or_matches_any_clause() {
        let predicate = json!({"or": [
            {"equals": {"m": "POST"}},
            {"equals": {"m": "GET"}}
        ]});
        assert!(eval(predicate, json!({"m": "get"})));
    }

    #[test]
    fn test_and_requires_every_clause() {
        let predicate = json!({"and": [
            {"equals": {"m": "GET"}},
            {"startsWith": {"p": "/api"}}
        ]});
        assert!(eval(predicate.clone(), json!({"m": "get", "p": "/api/x"})));
        assert!(!eval(predicate, json!({"m": "get", "p": "/other"})));
    }

    #[test]
    fn test_non_array_or_is_a_validation_error() {
        let mut state = json!({});
        let result = evaluate(
            &json!({"or": {"equals": {}}}),
            &json!({}),
            Encoding::Utf8,
            &mut state,
        );
        assert!(matches!(result, Err(PredicateError::Validation { .. })));
    }

    #[test]
    fn test_combinators_recurse_through_inject() {
        let mut state = json!({});
        let predicate = json!({"and": [
            {"equals": {"m": "GET"}},
            {"inject": "function (scope) { return scope.m === 'GET'; }"}
        ]});
        assert!(evaluate(&predicate, &json!({"m": "GET"}), Encoding::Utf8, &mut state).unwrap());
    }
}
