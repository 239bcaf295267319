use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::SubmitContext;
use domain::{IdempotencyKey, Order};

use crate::{OrderStore, Result, StoreError};

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<IdempotencyKey, Order>,
    create_calls: usize,
    fail_on_create: Option<String>,
}

/// In-memory order store for testing.
///
/// Provides the same uniqueness and atomicity guarantees as the PostgreSQL
/// implementation, plus failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create` fail with the given reason.
    /// `None` restores normal behavior.
    pub fn set_fail_on_create(&self, reason: Option<&str>) {
        self.state.write().unwrap().fail_on_create = reason.map(str::to_string);
    }

    /// Returns the number of stored orders.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the number of `create` calls, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.state.read().unwrap().create_calls
    }

    /// Returns the stored order for a key, if any.
    pub fn get(&self, key: &IdempotencyKey) -> Option<Order> {
        self.state.read().unwrap().orders.get(key).cloned()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, ctx: &SubmitContext, order: &Order) -> Result<Order> {
        ctx.check()?;

        let mut state = self.state.write().unwrap();
        state.create_calls += 1;

        if let Some(reason) = &state.fail_on_create {
            return Err(StoreError::Unavailable(reason.clone()));
        }

        let key = order.idempotency_key().clone();
        if state.orders.contains_key(&key) {
            return Err(StoreError::Conflict { key });
        }

        state.orders.insert(key, order.clone());
        Ok(order.clone())
    }

    async fn find_by_idempotency_key(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>> {
        ctx.check()?;
        Ok(self.state.read().unwrap().orders.get(key).cloned())
    }
}
