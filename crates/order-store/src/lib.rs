//! Order Store port.
//!
//! Persists an [`Order`](domain::Order) and its items as one durable unit and
//! enforces uniqueness of the idempotency key.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
