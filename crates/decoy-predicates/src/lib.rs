//! Request-predicate evaluation for decoy imposters.
//!
//! A predicate is a declarative record describing when a protocol request
//! matches a stub: a single operator key (`equals`, `deepEquals`,
//! `contains`, `startsWith`, `endsWith`, `matches`, `exists`, `not`, `or`,
//! `and`, `inject`) plus optional sibling parameters (`caseSensitive`,
//! `keyCaseSensitive`, `except`, `xpath`, `jsonpath`). The evaluator is a
//! pure function over already-parsed JSON values: it normalizes both sides
//! of the comparison, walks the expected shape against the actual request,
//! and answers with a boolean. Mismatches are `false`, never errors.
//!
//! # Module Structure
//!
//! - `value` - canonical JSON and scalar helpers over the value tree
//! - `options` - predicate parameters and the request encoding
//! - `transforms` - scalar transforms (case fold, except strip, base64,
//!   force-strings, JSON reach-through)
//! - `selectors` - XPath and JSONPath extraction
//! - `normalize` - the fixed-order normalization pipeline
//! - `matcher` - the structural walk of expected vs actual
//! - `operators` - leaf operators and their scalar comparators
//! - `inject` - user-code injection predicates
//! - `evaluate` - combinators and top-level dispatch
//!
//! # Example
//!
//! ```
//! use decoy_predicates::{evaluate, Encoding};
//! use serde_json::json;
//!
//! let predicate = json!({ "equals": { "body": { "name": "bob" } } });
//! let request = json!({ "method": "POST", "body": r#"{"name":"Bob"}"# });
//! let mut state = json!({});
//!
//! let matched = evaluate(&predicate, &request, Encoding::Utf8, &mut state).unwrap();
//! assert!(matched);
//! ```

mod error;
mod evaluate;
mod inject;
mod matcher;
mod normalize;
mod operators;
mod options;
mod selectors;
mod transforms;
mod value;

pub use error::PredicateError;
pub use evaluate::evaluate;
pub use normalize::{normalize, NormalizeOpts};
pub use options::{Encoding, JsonPathConfig, PredicateConfig, XPathConfig};
pub use value::canonical_string;
