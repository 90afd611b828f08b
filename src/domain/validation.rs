//! Input validation performed before any store round trip.

use thiserror::Error;

/// Malformed or missing input, rejected before the store is contacted.
///
/// Always recoverable: the caller can retry with corrected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required string argument was empty
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending argument
        field: &'static str,
    },
    /// A quantity, limit or duration that must be positive was not
    #[error("{field} must be greater than 0 (got {value})")]
    NotPositive {
        /// Name of the offending argument
        field: &'static str,
        /// Value that was supplied
        value: i64,
    },
    /// A batch exceeded the configured operation count
    #[error("batch of {len} operations exceeds the limit of {max}")]
    BatchTooLarge {
        /// Number of operations submitted
        len: usize,
        /// Configured maximum
        max: usize,
    },
}

pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

pub(crate) fn positive(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}

pub(crate) fn positive_u64(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        Err(ValidationError::NotPositive { field, value: 0 })
    } else {
        Ok(())
    }
}
