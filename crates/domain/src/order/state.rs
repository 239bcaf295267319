//! Order submission state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order as it moves through submission.
///
/// State transitions:
/// ```text
/// Pending ──► InventoryReserved ──► Committed
///    │               │
///    │               └──► Compensating ──► Failed
///    └──────────────────────────────────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order accepted, inventory not yet reserved.
    #[default]
    Pending,

    /// Inventory has been reserved, order not yet persisted.
    InventoryReserved,

    /// Order persisted (terminal state).
    Committed,

    /// Persistence failed, the reservation is being released.
    Compensating,

    /// Submission failed (terminal state).
    Failed,
}

impl OrderStatus {
    /// Returns true if the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, InventoryReserved)
                | (Pending, Failed)
                | (InventoryReserved, Committed)
                | (InventoryReserved, Compensating)
                | (Compensating, Failed)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Committed | OrderStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InventoryReserved => "InventoryReserved",
            OrderStatus::Committed => "Committed",
            OrderStatus::Compensating => "Compensating",
            OrderStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "InventoryReserved" => Ok(OrderStatus::InventoryReserved),
            "Committed" => Ok(OrderStatus::Committed),
            "Compensating" => Ok(OrderStatus::Compensating),
            "Failed" => Ok(OrderStatus::Failed),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}
