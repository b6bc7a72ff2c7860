//! Error types for tracking and querying.

use thiserror::Error;
use timebits::{Granularity, Identifier, KeyError};

/// Errors that can occur while tracking events or evaluating queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The bit store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The bit store rejected a command.
    #[error("Store error: {0}")]
    Store(String),

    /// Identifier does not fit in the store's bit address space.
    #[error("Invalid identifier: {identifier} exceeds maximum bit position {max}")]
    InvalidIdentifier {
        /// The offending identifier.
        identifier: Identifier,
        /// Largest position the store accepts.
        max: u64,
    },

    /// Query accessor used for a granularity the tracker does not record.
    #[error("Granularity not configured: {0}")]
    InvalidGranularity(Granularity),

    /// Key derivation failed.
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

impl TrackerError {
    /// Returns true for transport failures reaching the store.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TrackerError::StoreUnavailable(_))
    }
}

/// Result type for tracker operations.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use timebits::Operator;

    #[test]
    fn test_error_display_store_unavailable() {
        let err = TrackerError::StoreUnavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Store unavailable: connection refused");
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_error_display_invalid_identifier() {
        let err = TrackerError::InvalidIdentifier {
            identifier: 1 << 40,
            max: u64::from(u32::MAX),
        };
        assert_eq!(
            err.to_string(),
            "Invalid identifier: 1099511627776 exceeds maximum bit position 4294967295"
        );
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_error_display_invalid_granularity() {
        let err = TrackerError::InvalidGranularity(Granularity::Minute);
        assert_eq!(err.to_string(), "Granularity not configured: minute");
    }

    #[test]
    fn test_error_from_key_error() {
        let key_err = KeyError::Arity {
            operator: Operator::Not,
            expected: "exactly 1",
            actual: 0,
        };
        let err: TrackerError = key_err.into();
        assert!(matches!(err, TrackerError::Key(_)));
    }
}
