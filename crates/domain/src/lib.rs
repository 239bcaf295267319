//! Domain layer for the order submission service.
//!
//! This crate provides the order model shared by the coordinator and both ports:
//! - `Order` and `OrderItem`, validated on construction
//! - `OrderStatus`, the submission state machine
//! - `IdempotencyKey`, caller-supplied or derived from the request content

pub mod order;

pub use common::OrderId;
pub use order::{IdempotencyKey, Order, OrderError, OrderItem, OrderStatus, ProductId};
