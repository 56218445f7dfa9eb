use thiserror::Error;

use crate::value::ValueKind;

/// Errors produced while constructing preference values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The value has no representation among the supported variants.
    #[error("unsupported preference value: {value}")]
    Unsupported { value: String },

    /// A textual literal could not be parsed as the requested kind.
    #[error("invalid {kind} literal {input:?}: {reason}")]
    InvalidLiteral {
        kind: ValueKind,
        input: String,
        reason: String,
    },

    /// Unknown value kind name.
    #[error("unknown value kind: {0}")]
    UnknownKind(String),

    /// A defaults document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result alias for type construction.
pub type TypeResult<T> = Result<T, TypeError>;
