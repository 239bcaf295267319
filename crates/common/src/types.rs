use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned identifier of a persisted order.
///
/// Distinct from the idempotency key: two submissions that lose the race on
/// the same key are each assigned an ID, but only the winner's is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Assigns a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Rebuilds an ID read back from storage.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the UUID bound to the `orders.id` column.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
