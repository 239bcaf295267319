//! In-memory inventory for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::SubmitContext;
use domain::{IdempotencyKey, OrderItem, ProductId};

use crate::reservation::describe_rejection;
use crate::{InventoryError, InventoryPort, ItemOutcome, ItemStatus, Reservation};

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<ProductId, u32>,
    reservations: HashMap<IdempotencyKey, Vec<OrderItem>>,
    reserve_calls: usize,
    release_calls: usize,
    deductions: usize,
    transient_reserve_failures: u32,
    fail_on_release: Option<InventoryError>,
    reserve_delay: Duration,
}

/// In-memory inventory service.
///
/// Deduplicates reservations by idempotency key the way the remote service
/// does, and exposes counters and failure injection for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventory {
    /// Creates an inventory with no products.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the available stock for a product.
    pub fn with_stock(self, product_id: impl Into<ProductId>, quantity: u32) -> Self {
        self.set_stock(product_id, quantity);
        self
    }

    /// Sets the available stock for a product.
    pub fn set_stock(&self, product_id: impl Into<ProductId>, quantity: u32) {
        self.state
            .write()
            .unwrap()
            .stock
            .insert(product_id.into(), quantity);
    }

    /// Returns the available stock for a product.
    pub fn available(&self, product_id: &str) -> Option<u32> {
        self.state
            .read()
            .unwrap()
            .stock
            .get(&ProductId::new(product_id))
            .copied()
    }

    /// Makes the next `count` reserve calls fail transiently.
    pub fn fail_next_reserves(&self, count: u32) {
        self.state.write().unwrap().transient_reserve_failures = count;
    }

    /// Makes every release fail with `error`. `None` restores normal behavior.
    pub fn set_fail_on_release(&self, error: Option<InventoryError>) {
        self.state.write().unwrap().fail_on_release = error;
    }

    /// Delays every reserve call, to widen race windows in tests.
    pub fn set_reserve_delay(&self, delay: Duration) {
        self.state.write().unwrap().reserve_delay = delay;
    }

    /// Number of reserve calls received.
    pub fn reserve_calls(&self) -> usize {
        self.state.read().unwrap().reserve_calls
    }

    /// Number of release calls received.
    pub fn release_calls(&self) -> usize {
        self.state.read().unwrap().release_calls
    }

    /// Number of reservations that actually deducted stock.
    pub fn deductions(&self) -> usize {
        self.state.read().unwrap().deductions
    }

    /// Returns the number of active reservations.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    /// Returns true if a reservation is held under `key`.
    pub fn has_reservation(&self, key: &IdempotencyKey) -> bool {
        self.state.read().unwrap().reservations.contains_key(key)
    }
}

fn reserved_outcomes(items: &[OrderItem]) -> Vec<ItemOutcome> {
    items
        .iter()
        .map(|item| ItemOutcome::new(item.product_id.clone(), ItemStatus::Reserved, ""))
        .collect()
}

#[async_trait]
impl InventoryPort for InMemoryInventory {
    async fn reserve(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
        items: &[OrderItem],
    ) -> Result<Reservation, InventoryError> {
        ctx.check().map_err(|e| InventoryError::from_context(e, 0))?;

        let delay = {
            let mut state = self.state.write().unwrap();
            state.reserve_calls += 1;
            state.reserve_delay
        };
        if !delay.is_zero() {
            ctx.run(tokio::time::sleep(delay))
                .await
                .map_err(|e| InventoryError::from_context(e, 1))?;
        }

        let mut state = self.state.write().unwrap();

        if state.transient_reserve_failures > 0 {
            state.transient_reserve_failures -= 1;
            return Err(InventoryError::Transient("Unavailable: simulated outage".into()));
        }

        if let Some(held) = state.reservations.get(key) {
            return Ok(Reservation {
                idempotency_key: key.clone(),
                outcomes: reserved_outcomes(held),
            });
        }

        // Evaluate items in order against a running tally so repeated
        // products in one order are counted together.
        let mut remaining: HashMap<ProductId, u32> = HashMap::new();
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let available = match remaining.get(&item.product_id) {
                Some(left) => Some(*left),
                None => state.stock.get(&item.product_id).copied(),
            };
            let outcome = match available {
                None => ItemOutcome::new(
                    item.product_id.clone(),
                    ItemStatus::UnknownProduct,
                    "no such product",
                ),
                Some(left) if left < item.quantity => ItemOutcome::new(
                    item.product_id.clone(),
                    ItemStatus::Insufficient,
                    format!("requested {}, available {}", item.quantity, left),
                ),
                Some(left) => {
                    remaining.insert(item.product_id.clone(), left - item.quantity);
                    ItemOutcome::new(item.product_id.clone(), ItemStatus::Reserved, "")
                }
            };
            outcomes.push(outcome);
        }

        if outcomes.iter().any(|o| o.status != ItemStatus::Reserved) {
            return Err(InventoryError::Rejected {
                reason: describe_rejection(&outcomes),
                outcomes,
            });
        }

        for (product_id, left) in remaining {
            state.stock.insert(product_id, left);
        }
        state.deductions += 1;
        state.reservations.insert(key.clone(), items.to_vec());

        Ok(Reservation {
            idempotency_key: key.clone(),
            outcomes,
        })
    }

    async fn release(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<(), InventoryError> {
        ctx.check().map_err(|e| InventoryError::from_context(e, 0))?;

        let mut state = self.state.write().unwrap();
        state.release_calls += 1;

        if let Some(err) = &state.fail_on_release {
            return Err(err.clone());
        }

        if let Some(items) = state.reservations.remove(key) {
            for item in items {
                *state.stock.entry(item.product_id).or_insert(0) += item.quantity;
            }
        }
        Ok(())
    }
}
