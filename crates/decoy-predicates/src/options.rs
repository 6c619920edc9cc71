//! Predicate options for modifying matching behavior.
//!
//! Every predicate record may carry sibling keys next to its operator that
//! tune normalization: case folding, an `except` strip pattern, and the
//! XPath/JSONPath selector parameters. Unknown sibling keys are ignored so
//! they stay available for future use.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PredicateError;

/// String encoding of the actual request.
///
/// `base64` flags the request's string leaves as base64-encoded binary; they
/// are decoded before comparison, and selectors and regex matching are
/// rejected in that mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Base64,
}

/// Options recognized on a predicate record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateConfig {
    /// Whether value comparison is case-sensitive (default: false).
    #[serde(default)]
    pub case_sensitive: bool,

    /// Whether record-key comparison is case-sensitive. Defaults to
    /// `case_sensitive` when not given.
    #[serde(default)]
    pub key_case_sensitive: Option<bool>,

    /// Regex whose matches are removed from every string value before
    /// comparison. Global; ignores case when the predicate does.
    #[serde(default)]
    pub except: Option<String>,

    /// XPath extraction applied to the actual side before comparison.
    #[serde(default)]
    pub xpath: Option<XPathConfig>,

    /// JSONPath extraction applied to the actual side before comparison.
    #[serde(default)]
    pub jsonpath: Option<JsonPathConfig>,
}

/// `xpath` predicate parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct XPathConfig {
    pub selector: String,
    /// Namespace prefix bindings for the selector.
    #[serde(default)]
    pub ns: HashMap<String, String>,
}

/// `jsonpath` predicate parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonPathConfig {
    pub selector: String,
}

impl PredicateConfig {
    /// Extract the options from a predicate record. Operator keys and any
    /// unrecognized siblings are ignored; a recognized option with the wrong
    /// shape is a validation error.
    pub fn from_predicate(predicate: &Value) -> Result<Self, PredicateError> {
        serde_json::from_value(predicate.clone()).map_err(|e| {
            PredicateError::validation(format!("malformed predicate: {e}"), predicate.clone())
        })
    }

    /// Key case sensitivity, falling back to the value setting.
    pub fn key_case_sensitive(&self) -> bool {
        self.key_case_sensitive.unwrap_or(self.case_sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_case_insensitive() {
        let config = PredicateConfig::from_predicate(&json!({"equals": {"path": "/x"}})).unwrap();
        assert!(!config.case_sensitive);
        assert!(!config.key_case_sensitive());
        assert!(config.except.is_none());
    }

    #[test]
    fn test_key_case_sensitive_falls_back_to_case_sensitive() {
        let config =
            PredicateConfig::from_predicate(&json!({"equals": {}, "caseSensitive": true})).unwrap();
        assert!(config.key_case_sensitive());

        let config = PredicateConfig::from_predicate(
            &json!({"equals": {}, "caseSensitive": true, "keyCaseSensitive": false}),
        )
        .unwrap();
        assert!(!config.key_case_sensitive());
    }

    #[test]
    fn test_unknown_sibling_keys_are_ignored() {
        let config = PredicateConfig::from_predicate(
            &json!({"equals": {}, "comment": "reserved for future use"}),
        );
        assert!(config.is_ok());
    }

    #[test]
    fn test_selector_parameters_parse() {
        let config = PredicateConfig::from_predicate(&json!({
            "equals": {"body": "hi"},
            "xpath": {"selector": "//a", "ns": {"m": "http://example.com/m"}}
        }))
        .unwrap();
        let xpath = config.xpath.unwrap();
        assert_eq!(xpath.selector, "//a");
        assert_eq!(xpath.ns.get("m").map(String::as_str), Some("http://example.com/m"));
    }

    #[test]
    fn test_wrongly_typed_option_is_rejected() {
        assert!(PredicateConfig::from_predicate(&json!({"equals": {}, "caseSensitive": "yes"}))
            .is_err());
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(serde_json::to_string(&Encoding::Utf8).unwrap(), "\"utf8\"");
        assert_eq!(serde_json::to_string(&Encoding::Base64).unwrap(), "\"base64\"");
    }
}
