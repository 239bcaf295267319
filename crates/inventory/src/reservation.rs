//! Reservation outcomes as seen by callers of the port.

use domain::{IdempotencyKey, ProductId};

/// Per-item result of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    /// Stock was held for the item.
    Reserved,
    /// Not enough stock.
    Insufficient,
    /// The product does not exist.
    UnknownProduct,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Reserved => "reserved",
            ItemStatus::Insufficient => "insufficient",
            ItemStatus::UnknownProduct => "unknown_product",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome for one requested item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub product_id: ProductId,
    pub status: ItemStatus,
    /// Human-readable detail from the inventory service.
    pub reason: String,
}

impl ItemOutcome {
    pub fn new(product_id: ProductId, status: ItemStatus, reason: impl Into<String>) -> Self {
        Self {
            product_id,
            status,
            reason: reason.into(),
        }
    }
}

/// A successful reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Key the reservation is held under; release uses the same key.
    pub idempotency_key: IdempotencyKey,
    pub outcomes: Vec<ItemOutcome>,
}

/// Summarises the failed items of a rejected reservation.
pub(crate) fn describe_rejection(outcomes: &[ItemOutcome]) -> String {
    let failed: Vec<String> = outcomes
        .iter()
        .filter(|o| o.status != ItemStatus::Reserved)
        .map(|o| {
            if o.reason.is_empty() {
                format!("{}: {}", o.product_id, o.status)
            } else {
                format!("{}: {} ({})", o.product_id, o.status, o.reason)
            }
        })
        .collect();

    if failed.is_empty() {
        "reservation refused".to_string()
    } else {
        failed.join(", ")
    }
}
