//! Errors surfaced by the coordination primitives.
//!
//! Business-level refusals (rate limited, insufficient stock, lock held by
//! another owner, counter at max) are not errors; they come back as data in
//! the outcome types.

use crate::application::ports::StoreError;
use crate::domain::procedure::Procedure;
use crate::domain::validation::ValidationError;
use thiserror::Error;

/// Result alias for coordination operations.
pub type Result<T> = std::result::Result<T, CoordinationError>;

/// Error returned by a coordination primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    /// Input rejected before contacting the store
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// The store could not be reached or did not answer in time
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    /// The store answered with a shape the procedure never produces
    #[error("unexpected reply from {procedure}: {detail}")]
    UnexpectedReply {
        /// Procedure that produced the reply
        procedure: Procedure,
        /// What was wrong with it
        detail: String,
    },
}

impl CoordinationError {
    /// Whether the same call may succeed if retried later.
    ///
    /// Retrying is the caller's decision: a mutating call whose outcome is
    /// unknown (see [`outcome_unknown`](Self::outcome_unknown)) may already
    /// have been applied.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoordinationError::StoreUnavailable(_))
    }

    /// Whether the store may have applied the operation despite the error.
    ///
    /// Treat lock ownership and stock as unknown when this is true.
    pub fn outcome_unknown(&self) -> bool {
        match self {
            CoordinationError::Validation(_) => false,
            CoordinationError::StoreUnavailable(StoreError::CircuitOpen) => false,
            CoordinationError::StoreUnavailable(_) => true,
            CoordinationError::UnexpectedReply { .. } => true,
        }
    }

    /// Whether the fault lies with the caller's input (4xx class) rather than
    /// with the store (5xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoordinationError::Validation(_))
    }
}
