//! XPath and JSONPath extraction over the actual side of a comparison.
//!
//! Both selector kinds produce a scalar when exactly one node matches, a
//! sequence otherwise; an empty selection is an empty sequence. A selector
//! that fails to compile is a validation error, while an input document the
//! selector cannot apply to (e.g. a non-XML body under `xpath`) is simply an
//! empty selection.

use std::collections::HashMap;

use serde_json::Value;
use serde_json_path::JsonPath;
use sxd_xpath::{Context, Factory};

use crate::error::PredicateError;

/// One node collapses to the scalar itself; zero or many stay a sequence.
fn collapse(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

/// Evaluate an XPath selector against the textual form of the input under
/// the given namespace bindings, producing matched node string-values in
/// document order.
pub(crate) fn select_xpath(
    selector: &str,
    ns: &HashMap<String, String>,
    text: &str,
) -> Result<Value, PredicateError> {
    let factory = Factory::new();
    let xpath = factory
        .build(selector)
        .map_err(|e| {
            PredicateError::validation(
                format!("malformed xpath selector: {e}"),
                Value::String(selector.to_string()),
            )
        })?
        .ok_or_else(|| {
            PredicateError::validation(
                "empty xpath selector",
                Value::String(selector.to_string()),
            )
        })?;

    let package = match sxd_document::parser::parse(text) {
        Ok(package) => package,
        // Not an XML document: nothing to select.
        Err(_) => return Ok(Value::Array(Vec::new())),
    };
    let document = package.as_document();

    let mut context = Context::new();
    for (prefix, uri) in ns {
        context.set_namespace(prefix, uri);
    }

    let evaluated = xpath.evaluate(&context, document.root()).map_err(|e| {
        PredicateError::validation(
            format!("failed to evaluate xpath selector: {e}"),
            Value::String(selector.to_string()),
        )
    })?;

    Ok(match evaluated {
        sxd_xpath::Value::Nodeset(nodes) => collapse(
            nodes
                .document_order()
                .iter()
                .map(|node| Value::String(node.string_value()))
                .collect(),
        ),
        sxd_xpath::Value::String(s) => Value::String(s),
        sxd_xpath::Value::Number(n) => {
            // Integral results render without a trailing ".0"
            if n.fract() == 0.0 {
                Value::String(format!("{}", n as i64))
            } else {
                Value::String(n.to_string())
            }
        }
        sxd_xpath::Value::Boolean(b) => Value::String(b.to_string()),
    })
}

/// Evaluate a JSONPath selector against an already-parsed document.
pub(crate) fn select_jsonpath(selector: &str, document: &Value) -> Result<Value, PredicateError> {
    let path = JsonPath::parse(selector).map_err(|e| {
        PredicateError::validation(
            format!("malformed jsonpath selector: {e}"),
            Value::String(selector.to_string()),
        )
    })?;
    Ok(collapse(path.query(document).all().into_iter().cloned().collect()))
}
