//! Submission error types.

use domain::{IdempotencyKey, OrderError};
use inventory::{InventoryError, ItemOutcome};
use order_store::StoreError;
use thiserror::Error;

/// Errors returned by [`OrderSubmissionCoordinator::submit`].
///
/// [`OrderSubmissionCoordinator::submit`]: crate::OrderSubmissionCoordinator::submit
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request was malformed. No remote call was made.
    #[error("Invalid order: {0}")]
    Validation(#[from] OrderError),

    /// Inventory refused the reservation. Retrying will not help.
    #[error("Inventory rejected order {key}: {reason}")]
    InventoryRejected {
        key: IdempotencyKey,
        reason: String,
        outcomes: Vec<ItemOutcome>,
    },

    /// Inventory could not be reached in time. Safe to retry with the same key.
    #[error("Inventory unavailable for order {key}: {source}")]
    InventoryUnavailable {
        key: IdempotencyKey,
        #[source]
        source: InventoryError,
    },

    /// The order could not be persisted.
    ///
    /// No reservation is left behind for it. The failure happened before
    /// reserving, the reservation was released, or the reservation belongs to
    /// a concurrent submission of the same key.
    #[error("Failed to persist order {key}: {source}")]
    PersistenceFailure {
        key: IdempotencyKey,
        #[source]
        source: StoreError,
    },

    /// The reservation could not be released after the submission aborted.
    ///
    /// Stock stays held under `key` until reconciled by an operator.
    #[error("Compensation failed for order {key} after {cause}: {release}")]
    CompensationFailure {
        key: IdempotencyKey,
        cause: String,
        release: InventoryError,
    },

    /// The caller cancelled the submission or its deadline passed.
    #[error("Order submission cancelled")]
    Cancelled,
}

impl SubmitError {
    /// Returns the error category.
    pub fn kind(&self) -> SubmitErrorKind {
        match self {
            SubmitError::Validation(_) => SubmitErrorKind::Validation,
            SubmitError::InventoryRejected { .. } => SubmitErrorKind::InventoryRejected,
            SubmitError::InventoryUnavailable { .. } => SubmitErrorKind::InventoryUnavailable,
            SubmitError::PersistenceFailure { .. } => SubmitErrorKind::PersistenceFailure,
            SubmitError::CompensationFailure { .. } => SubmitErrorKind::CompensationFailure,
            SubmitError::Cancelled => SubmitErrorKind::Cancelled,
        }
    }

    /// Returns true if resubmitting with the same key may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::InventoryUnavailable { .. })
    }

    /// Returns true if stock may be stranded and needs manual reconciliation.
    pub fn requires_reconciliation(&self) -> bool {
        matches!(self, SubmitError::CompensationFailure { .. })
    }

    /// Returns the idempotency key the failure relates to, when one was resolved.
    pub fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        match self {
            SubmitError::InventoryRejected { key, .. }
            | SubmitError::InventoryUnavailable { key, .. }
            | SubmitError::PersistenceFailure { key, .. }
            | SubmitError::CompensationFailure { key, .. } => Some(key),
            SubmitError::Validation(_) | SubmitError::Cancelled => None,
        }
    }
}

/// Category of a [`SubmitError`], used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitErrorKind {
    Validation,
    InventoryRejected,
    InventoryUnavailable,
    PersistenceFailure,
    CompensationFailure,
    Cancelled,
}

impl SubmitErrorKind {
    /// Returns the label string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitErrorKind::Validation => "validation",
            SubmitErrorKind::InventoryRejected => "inventory_rejected",
            SubmitErrorKind::InventoryUnavailable => "inventory_unavailable",
            SubmitErrorKind::PersistenceFailure => "persistence_failure",
            SubmitErrorKind::CompensationFailure => "compensation_failure",
            SubmitErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SubmitErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
