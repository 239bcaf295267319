//! Inventory error types.

use common::ContextError;
use thiserror::Error;

use crate::reservation::ItemOutcome;

/// Errors returned by an inventory port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Business rejection (insufficient stock, unknown product). Never retried.
    #[error("Inventory rejected reservation: {reason}")]
    Rejected {
        reason: String,
        outcomes: Vec<ItemOutcome>,
    },

    /// A single attempt failed in a way that may succeed on retry.
    #[error("Inventory temporarily unavailable: {0}")]
    Transient(String),

    /// Transient failures persisted past the attempt limit or the deadline.
    #[error("Inventory unavailable after {attempts} attempt(s): {reason}")]
    Exhausted { attempts: u32, reason: String },

    /// The caller cancelled the operation.
    #[error("Inventory call cancelled")]
    Cancelled,

    /// Any other remote failure. Not retried.
    #[error("Inventory service error: {0}")]
    Remote(String),
}

impl InventoryError {
    /// Returns true if the retry policy should try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, InventoryError::Transient(_))
    }

    /// Returns true for a business rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, InventoryError::Rejected { .. })
    }

    pub(crate) fn from_context(err: ContextError, attempts: u32) -> Self {
        match err {
            ContextError::Cancelled => InventoryError::Cancelled,
            ContextError::DeadlineExceeded => InventoryError::Exhausted {
                attempts,
                reason: "deadline exceeded".to_string(),
            },
        }
    }
}
