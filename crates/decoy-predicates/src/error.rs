//! Error types for predicate evaluation.

use serde_json::Value;

/// Errors surfaced by the predicate evaluator.
///
/// Structural mismatches never produce an error: a predicate that simply
/// fails to match evaluates to `false`. Errors are reserved for predicates
/// that cannot be evaluated at all (malformed input, options that do not
/// apply to the chosen encoding) and for failures inside user injection.
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    /// The predicate is malformed or carries an option that is invalid for
    /// the request encoding. `subject` is the offending predicate fragment.
    #[error("{message}")]
    Validation { message: String, subject: Value },

    /// User-supplied injection source failed to execute. `script` is the
    /// wrapped source that ran, `data` the underlying engine message.
    #[error("invalid predicate injection: {data}")]
    Injection { script: String, data: String },
}

impl PredicateError {
    pub fn validation(message: impl Into<String>, subject: Value) -> Self {
        PredicateError::Validation {
            message: message.into(),
            subject,
        }
    }
}
