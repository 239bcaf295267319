use std::sync::Arc;

use async_trait::async_trait;
use common::SubmitContext;
use domain::{IdempotencyKey, OrderItem};

use crate::{InventoryError, Reservation};

/// Reservation and release of stock on the inventory service.
///
/// Both operations are keyed by the order's idempotency key so that the
/// inventory side can deduplicate retried calls.
#[async_trait]
pub trait InventoryPort: Send + Sync {
    /// Reserves stock for every item, or nothing.
    async fn reserve(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
        items: &[OrderItem],
    ) -> Result<Reservation, InventoryError>;

    /// Releases the reservation held under `key`.
    ///
    /// Releasing a key with no reservation succeeds.
    async fn release(&self, ctx: &SubmitContext, key: &IdempotencyKey)
    -> Result<(), InventoryError>;
}

#[async_trait]
impl<T: InventoryPort + ?Sized> InventoryPort for Arc<T> {
    async fn reserve(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
        items: &[OrderItem],
    ) -> Result<Reservation, InventoryError> {
        (**self).reserve(ctx, key, items).await
    }

    async fn release(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<(), InventoryError> {
        (**self).release(ctx, key).await
    }
}
