//! The normalization pipeline applied to both sides of every comparison.
//!
//! Normalization walks the whole value tree: record keys go through the key
//! transform, string leaves through the value transforms, and sequences are
//! sorted by canonical JSON after their contents are transformed (so the
//! sort key is stable). The value transforms run in a fixed order: selector
//! extraction, except strip, case fold, base64 decode. Only the actual side
//! gets selector extraction.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::error::PredicateError;
use crate::options::{Encoding, PredicateConfig};
use crate::selectors;
use crate::transforms;
use crate::value::canonical_string;

/// Per-call switches for [`normalize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOpts {
    pub encoding: Encoding,
    /// True only for the actual side.
    pub with_selectors: bool,
    /// True only for `deepEquals`: the JSONPath document is coerced through
    /// force-strings before selection.
    pub should_force_strings: bool,
}

enum Selector {
    XPath {
        selector: String,
        ns: HashMap<String, String>,
    },
    JsonPath {
        selector: String,
    },
}

/// The compiled value pipeline for one normalization pass.
struct Pipeline<'a> {
    config: &'a PredicateConfig,
    selector: Option<Selector>,
    except: Option<Regex>,
    fold_keys: bool,
    fold_values: bool,
    decode_base64: bool,
    should_force_strings: bool,
}

/// Normalize a value tree for comparison under the given predicate config.
pub fn normalize(
    value: &Value,
    config: &PredicateConfig,
    opts: NormalizeOpts,
) -> Result<Value, PredicateError> {
    Pipeline::build(config, opts)?.transform_all(value)
}

impl<'a> Pipeline<'a> {
    fn build(config: &'a PredicateConfig, opts: NormalizeOpts) -> Result<Self, PredicateError> {
        let selector = if opts.with_selectors {
            Self::build_selector(config, opts.encoding)?
        } else {
            None
        };

        Ok(Pipeline {
            config,
            selector,
            except: transforms::compile_except(config)?,
            fold_keys: !config.key_case_sensitive(),
            fold_values: !config.case_sensitive,
            decode_base64: opts.encoding == Encoding::Base64,
            should_force_strings: opts.should_force_strings,
        })
    }

    /// Resolve the selector parameter, folding the selector string (and, for
    /// XPath, the namespace bindings) when the predicate is case-insensitive.
    /// JSONPath folds with the key sensitivity so `matches` predicates keep
    /// regex case on values while still getting case-insensitive keys.
    fn build_selector(
        config: &PredicateConfig,
        encoding: Encoding,
    ) -> Result<Option<Selector>, PredicateError> {
        if let Some(jsonpath) = &config.jsonpath {
            if encoding == Encoding::Base64 {
                return Err(PredicateError::validation(
                    "the jsonpath predicate parameter is not allowed in binary mode",
                    Value::String(jsonpath.selector.clone()),
                ));
            }
            let selector = if config.key_case_sensitive() {
                jsonpath.selector.clone()
            } else {
                jsonpath.selector.to_lowercase()
            };
            return Ok(Some(Selector::JsonPath { selector }));
        }

        if let Some(xpath) = &config.xpath {
            if encoding == Encoding::Base64 {
                return Err(PredicateError::validation(
                    "the xpath predicate parameter is not allowed in binary mode",
                    Value::String(xpath.selector.clone()),
                ));
            }
            let (selector, ns) = if config.case_sensitive {
                (xpath.selector.clone(), xpath.ns.clone())
            } else {
                (
                    xpath.selector.to_lowercase(),
                    xpath
                        .ns
                        .iter()
                        .map(|(prefix, uri)| (prefix.to_lowercase(), uri.to_lowercase()))
                        .collect(),
                )
            };
            return Ok(Some(Selector::XPath { selector, ns }));
        }

        Ok(None)
    }

    fn transform_all(&self, value: &Value) -> Result<Value, PredicateError> {
        match value {
            Value::Array(items) => {
                let mut transformed = Vec::with_capacity(items.len());
                for item in items {
                    transformed.push(self.transform_all(item)?);
                }
                Ok(Value::Array(sort_by_canonical(transformed)))
            }
            Value::Object(fields) => {
                let mut transformed = serde_json::Map::new();
                for (key, field) in fields {
                    let key = if self.fold_keys {
                        key.to_lowercase()
                    } else {
                        key.clone()
                    };
                    transformed.insert(key, self.transform_all(field)?);
                }
                Ok(Value::Object(transformed))
            }
            Value::String(s) => self.transform_string(s),
            scalar => Ok(scalar.clone()),
        }
    }

    fn transform_string(&self, s: &str) -> Result<Value, PredicateError> {
        let selected = match &self.selector {
            Some(selector) => self.select(selector, s)?,
            None => Value::String(s.to_string()),
        };
        Ok(self.finish(selected))
    }

    fn select(&self, selector: &Selector, text: &str) -> Result<Value, PredicateError> {
        match selector {
            Selector::XPath { selector, ns } => selectors::select_xpath(selector, ns, text),
            Selector::JsonPath { selector } => {
                let parsed = transforms::try_json(text, self.config)?;
                let document = if self.should_force_strings {
                    transforms::force_strings(&parsed)
                } else {
                    parsed
                };
                selectors::select_jsonpath(selector, &document)
            }
        }
    }

    /// The remaining scalar stages over a selection result, sorting any
    /// multi-valued selection so its order is irrelevant.
    fn finish(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.scalar(&s)),
            Value::Array(items) => Value::Array(sort_by_canonical(
                items.into_iter().map(|item| self.finish(item)).collect(),
            )),
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, field)| (key, self.finish(field)))
                    .collect(),
            ),
            scalar => scalar,
        }
    }

    fn scalar(&self, s: &str) -> String {
        let s = transforms::strip_except(s, self.except.as_ref());
        let s = if self.fold_values {
            transforms::lowercase(&s)
        } else {
            s
        };
        if self.decode_base64 {
            transforms::decode_base64(&s)
        } else {
            s
        }
    }
}

/// The lighter pass `try_json` runs over a freshly parsed document: key
/// fold, except strip and case fold, but no sorting and no selection.
pub(crate) fn transform_parsed(
    value: &Value,
    config: &PredicateConfig,
) -> Result<Value, PredicateError> {
    let except = transforms::compile_except(config)?;
    Ok(transform_parsed_inner(
        value,
        except.as_ref(),
        !config.key_case_sensitive(),
        !config.case_sensitive,
    ))
}

fn transform_parsed_inner(
    value: &Value,
    except: Option<&Regex>,
    fold_keys: bool,
    fold_values: bool,
) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| transform_parsed_inner(item, except, fold_keys, fold_values))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, field)| {
                    let key = if fold_keys { key.to_lowercase() } else { key.clone() };
                    (key, transform_parsed_inner(field, except, fold_keys, fold_values))
                })
                .collect(),
        ),
        Value::String(s) => {
            let s = transforms::strip_except(s, except);
            Value::String(if fold_values { transforms::lowercase(&s) } else { s })
        }
        scalar => scalar.clone(),
    }
}

fn sort_by_canonical(mut items: Vec<Value>) -> Vec<Value> {
    items.sort_by(|a, b| canonical_string(a).cmp(&canonical_string(b)));
    items
}
