use thiserror::Error;

/// Errors raised synchronously when a caller mutates or queries a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Caller input has the wrong type or cannot be parsed.
    #[error("Invalid value: {0}")]
    Validation(String),

    /// Attempted write to an immutable or write-once field.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
