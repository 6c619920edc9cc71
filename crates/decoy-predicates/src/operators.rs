//! Leaf predicate operators.
//!
//! Every leaf operator routes through the same pipeline: normalize both
//! sides (selectors only on the actual side), then run the structural
//! matcher with an operator-specific scalar comparison. The dispatcher hands
//! each operator the operand it matched, alongside the full predicate record
//! for its sibling options.

use regex::RegexBuilder;
use serde_json::Value;

use crate::error::PredicateError;
use crate::matcher::{predicate_satisfied, LeafFn, MatchContext};
use crate::normalize::{normalize, NormalizeOpts};
use crate::options::{Encoding, PredicateConfig};
use crate::transforms::{force_strings, try_json};
use crate::value::{canonical_string, is_truthy, scalar_text};

fn run_leaf(
    expected: &Value,
    request: &Value,
    config: &PredicateConfig,
    encoding: Encoding,
    exists_operator: bool,
    leaf: &LeafFn,
) -> Result<bool, PredicateError> {
    let expected = normalize(
        expected,
        config,
        NormalizeOpts {
            encoding,
            ..NormalizeOpts::default()
        },
    )?;
    let actual = normalize(
        request,
        config,
        NormalizeOpts {
            encoding,
            with_selectors: true,
            ..NormalizeOpts::default()
        },
    )?;
    let ctx = MatchContext {
        config,
        exists_operator,
    };
    predicate_satisfied(&expected, &actual, &ctx, leaf)
}

pub(crate) fn equals(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    let config = PredicateConfig::from_predicate(predicate)?;
    run_leaf(operand, request, &config, encoding, false, &|e, a| {
        Ok(canonical_string(e) == canonical_string(a))
    })
}

pub(crate) fn contains(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    let config = PredicateConfig::from_predicate(predicate)?;
    run_leaf(operand, request, &config, encoding, false, &|e, a| {
        Ok(scalar_text(a).contains(scalar_text(e).as_ref()))
    })
}

pub(crate) fn starts_with(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    let config = PredicateConfig::from_predicate(predicate)?;
    run_leaf(operand, request, &config, encoding, false, &|e, a| {
        Ok(scalar_text(a).starts_with(scalar_text(e).as_ref()))
    })
}

pub(crate) fn ends_with(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    let config = PredicateConfig::from_predicate(predicate)?;
    run_leaf(operand, request, &config, encoding, false, &|e, a| {
        Ok(scalar_text(a).ends_with(scalar_text(e).as_ref()))
    })
}

pub(crate) fn exists(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    let config = PredicateConfig::from_predicate(predicate)?;
    run_leaf(operand, request, &config, encoding, true, &|e, a| {
        let present = !scalar_text(a).is_empty();
        Ok(if is_truthy(e) { present } else { !present })
    })
}

/// Regex match. Values skip the case fold so upper-case metacharacters like
/// `\W` and `\S` survive; case-insensitivity moves into the regex flags
/// instead. Keys keep folding with the caller's original sensitivity.
pub(crate) fn matches(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    if encoding == Encoding::Base64 {
        return Err(PredicateError::validation(
            "the matches predicate is not allowed in binary mode",
            predicate.clone(),
        ));
    }

    let mut config = PredicateConfig::from_predicate(predicate)?;
    let ignore_case = !config.case_sensitive;
    config.key_case_sensitive = Some(config.case_sensitive);
    config.case_sensitive = true;

    run_leaf(operand, request, &config, encoding, false, &move |e, a| {
        let pattern = scalar_text(e);
        let regex = RegexBuilder::new(pattern.as_ref())
            .case_insensitive(ignore_case)
            .build()
            .map_err(|err| {
                PredicateError::validation(format!("invalid regex: {err}"), e.clone())
            })?;
        Ok(regex.is_match(scalar_text(a).as_ref()))
    })
}

/// Strict structural equality per top-level expected key, with both sides
/// coerced through force-strings first.
pub(crate) fn deep_equals(
    predicate: &Value,
    operand: &Value,
    request: &Value,
    encoding: Encoding,
) -> Result<bool, PredicateError> {
    let config = PredicateConfig::from_predicate(predicate)?;
    let expected = normalize(
        &force_strings(operand),
        &config,
        NormalizeOpts {
            encoding,
            ..NormalizeOpts::default()
        },
    )?;
    let actual = normalize(
        &force_strings(request),
        &config,
        NormalizeOpts {
            encoding,
            with_selectors: true,
            should_force_strings: true,
        },
    )?;

    let Some(expected_fields) = expected.as_object() else {
        return Ok(canonical_string(&expected) == canonical_string(&actual));
    };

    for (field, expected_field) in expected_fields {
        let mut actual_field = actual.get(field.as_str()).cloned().unwrap_or(Value::Null);
        // A record predicate against a JSON-encoded string field compares
        // against the re-parsed document.
        if expected_field.is_object() {
            if let Value::String(s) = &actual_field {
                let parsed = try_json(s, &config)?;
                actual_field = normalize(
                    &force_strings(&parsed),
                    &config,
                    NormalizeOpts {
                        encoding,
                        ..NormalizeOpts::default()
                    },
                )?;
            }
        }
        if canonical_string(expected_field) != canonical_string(&actual_field) {
            return Ok(false);
        }
    }
    Ok(true)
}
