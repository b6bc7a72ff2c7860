//! Error types for key derivation.

use thiserror::Error;

use crate::Operator;

/// Errors that can occur while deriving storage keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The operator was given the wrong number of operands.
    #[error("{operator} expects {expected} operand(s), got {actual}")]
    Arity {
        /// The operator being encoded.
        operator: Operator,
        /// Human readable operand requirement.
        expected: &'static str,
        /// Number of operands supplied.
        actual: usize,
    },

    /// Granularity tag could not be recognised.
    #[error("unknown granularity: {0}")]
    UnknownGranularity(String),
}

/// Result type for key derivation.
pub type KeyResult<T> = std::result::Result<T, KeyError>;
