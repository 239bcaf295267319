//! Shared types for the order submission service.

pub mod context;
pub mod types;

pub use context::{CancelHandle, ContextError, SubmitContext};
pub use types::OrderId;
