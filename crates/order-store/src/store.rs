use async_trait::async_trait;
use common::SubmitContext;
use domain::{IdempotencyKey, Order};

use crate::Result;

/// Durable persistence of orders.
///
/// Implementations must be thread-safe (Send + Sync) and must never expose a
/// partially written order: either the order with all of its items exists,
/// or nothing does.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order and its items atomically.
    ///
    /// Fails with `StoreError::Conflict` if an order with the same
    /// idempotency key is already stored. The stored order is returned
    /// exactly as given; the store never changes its status.
    async fn create(&self, ctx: &SubmitContext, order: &Order) -> Result<Order>;

    /// Looks up an order by idempotency key.
    ///
    /// Returns None if no order with that key has been persisted.
    async fn find_by_idempotency_key(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for std::sync::Arc<T> {
    async fn create(&self, ctx: &SubmitContext, order: &Order) -> Result<Order> {
        (**self).create(ctx, order).await
    }

    async fn find_by_idempotency_key(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>> {
        (**self).find_by_idempotency_key(ctx, key).await
    }
}
