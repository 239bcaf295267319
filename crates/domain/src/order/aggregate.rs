//! Order aggregate.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{IdempotencyKey, OrderError, OrderItem, OrderStatus};

/// Order aggregate root.
///
/// Built by the submission coordinator from a caller's request and moved
/// through [`OrderStatus`] by it alone. Stores only ever read it back with
/// [`Order::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Server-assigned order identifier.
    id: OrderId,

    /// Deduplicates retried submissions.
    idempotency_key: IdempotencyKey,

    /// Items in request order.
    items: Vec<OrderItem>,

    /// Current submission status.
    status: OrderStatus,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order.
    ///
    /// Fails if there are no items or any item is invalid.
    pub fn new(idempotency_key: IdempotencyKey, items: Vec<OrderItem>) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            item.validate()?;
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            idempotency_key,
            items,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from persisted fields without any transition checks.
    pub fn restore(
        id: OrderId,
        idempotency_key: IdempotencyKey,
        items: Vec<OrderItem>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            idempotency_key,
            items,
            status,
            created_at,
            updated_at,
        }
    }

    /// Moves the order to `next`, enforcing the state machine.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the idempotency key.
    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }

    /// Returns the items in request order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
