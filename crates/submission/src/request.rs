//! Submission request.

use domain::{IdempotencyKey, OrderError, OrderItem};

/// A request to submit an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOrder {
    /// Caller-supplied idempotency key. Derived from `items` when absent.
    pub idempotency_key: Option<String>,
    /// Requested items, in order.
    pub items: Vec<OrderItem>,
}

impl SubmitOrder {
    /// Creates a request whose key is derived from its items.
    pub fn new(items: Vec<OrderItem>) -> Self {
        Self {
            idempotency_key: None,
            items,
        }
    }

    /// Sets an explicit idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Resolves the key this request is submitted under.
    pub fn resolve_key(&self) -> Result<IdempotencyKey, OrderError> {
        match &self.idempotency_key {
            Some(key) => IdempotencyKey::new(key.as_str()),
            None => Ok(IdempotencyKey::derive(&self.items)),
        }
    }
}
