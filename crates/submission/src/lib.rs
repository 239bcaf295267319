//! Order submission.
//!
//! The coordinator drives one order through the submission state machine:
//! 1. Reserve inventory under the order's idempotency key
//! 2. Persist the committed order
//!
//! If persistence fails after a successful reservation, the reservation is
//! released. Resubmitting a key that is already stored returns the stored
//! order without reserving again.

pub mod coordinator;
pub mod error;
mod inflight;
pub mod request;

pub use coordinator::{CoordinatorConfig, OrderSubmissionCoordinator};
pub use error::{SubmitError, SubmitErrorKind};
pub use request::SubmitOrder;
