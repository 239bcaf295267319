//! Inventory port.
//!
//! Reserves and releases stock for an order on the remote inventory service.
//! The port owns retry with exponential backoff and the translation of remote
//! outcomes into business rejections and transient failures; callers only see
//! [`InventoryPort`] and [`InventoryError`].

pub mod error;
pub mod grpc;
pub mod memory;
pub mod port;
pub mod proto;
pub mod reservation;
pub mod retry;

pub use error::InventoryError;
pub use grpc::GrpcInventoryPort;
pub use memory::InMemoryInventory;
pub use port::InventoryPort;
pub use reservation::{ItemOutcome, ItemStatus, Reservation};
pub use retry::RetryPolicy;
