//! Value objects for the order domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderError;

/// Namespace for idempotency keys derived from request content.
const DERIVED_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x8c2f_41d6_7a3e_4b90_9e15_d4c7_a0b3_26f1);

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Quantity ordered.
    pub quantity: u32,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Checks the item invariants: non-blank product and positive quantity.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.product_id.as_str().trim().is_empty() {
            return Err(OrderError::InvalidProductId);
        }
        if self.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: self.product_id.to_string(),
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// Key that makes repeated submissions of the same logical order safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Longest accepted key, matching the storage column.
    pub const MAX_LEN: usize = 128;

    /// Wraps a caller-supplied key.
    pub fn new(key: impl Into<String>) -> Result<Self, OrderError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(OrderError::InvalidIdempotencyKey {
                reason: "must not be blank".to_string(),
            });
        }
        if key.len() > Self::MAX_LEN {
            return Err(OrderError::InvalidIdempotencyKey {
                reason: format!("longer than {} bytes", Self::MAX_LEN),
            });
        }
        Ok(Self(key))
    }

    /// Derives a key from the ordered item list.
    ///
    /// The same items in the same order always yield the same key.
    pub fn derive(items: &[OrderItem]) -> Self {
        let mut canonical = String::new();
        for item in items {
            let pid = item.product_id.as_str();
            canonical.push_str(&format!("{}:{}:{}\n", pid.len(), pid, item.quantity));
        }
        let id = Uuid::new_v5(&DERIVED_KEY_NAMESPACE, canonical.as_bytes());
        Self(format!("derived-{id}"))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
