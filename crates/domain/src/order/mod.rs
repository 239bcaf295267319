//! Order model and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use state::OrderStatus;
pub use value_objects::{IdempotencyKey, OrderItem, ProductId};

use thiserror::Error;

/// Errors raised while building or transitioning an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// Product identifier is blank.
    #[error("Product ID must not be blank")]
    InvalidProductId,

    /// Idempotency key is malformed.
    #[error("Invalid idempotency key: {reason}")]
    InvalidIdempotencyKey { reason: String },

    /// Order is not in a state that allows the requested transition.
    #[error("Invalid state transition: cannot move from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },

    /// Stored status text does not name a known status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
