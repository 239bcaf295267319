use common::ContextError;
use domain::IdempotencyKey;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with the same idempotency key is already persisted.
    #[error("Order with idempotency key {key} already exists")]
    Conflict { key: IdempotencyKey },

    /// The request context was cancelled or expired before the operation ran.
    #[error("Store operation aborted: {0}")]
    Context(#[from] ContextError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned back into an order.
    #[error("Corrupt order record: {0}")]
    Corrupt(String),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true for a uniqueness conflict on the idempotency key.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
