//! Integration tests for order submission against in-memory ports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{CancelHandle, SubmitContext};
use domain::{IdempotencyKey, Order, OrderItem, OrderStatus};
use inventory::{InMemoryInventory, InventoryError, InventoryPort, ItemStatus, Reservation};
use order_store::{InMemoryOrderStore, OrderStore};
use submission::{
    CoordinatorConfig, OrderSubmissionCoordinator, SubmitError, SubmitErrorKind, SubmitOrder,
};

type TestCoordinator = OrderSubmissionCoordinator<InMemoryInventory, InMemoryOrderStore>;

struct TestHarness {
    coordinator: TestCoordinator,
    inventory: InMemoryInventory,
    store: InMemoryOrderStore,
}

impl TestHarness {
    fn new() -> Self {
        let inventory = InMemoryInventory::new()
            .with_stock("sku-1", 5)
            .with_stock("sku-2", 1);
        let store = InMemoryOrderStore::new();
        let coordinator = OrderSubmissionCoordinator::new(inventory.clone(), store.clone());

        Self {
            coordinator,
            inventory,
            store,
        }
    }
}

fn key(k: &str) -> IdempotencyKey {
    IdempotencyKey::new(k).unwrap()
}

#[tokio::test]
async fn scenario_a_reserve_and_commit() {
    let h = TestHarness::new();
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("a-1");

    let order = h.coordinator.submit(&ctx, request).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Committed);
    assert_eq!(order.items(), &[OrderItem::new("sku-1", 2)]);
    assert_eq!(h.inventory.available("sku-1"), Some(3));

    let stored = h.store.get(&key("a-1")).unwrap();
    assert_eq!(stored.id(), order.id());
    assert_eq!(stored.status(), OrderStatus::Committed);
}

#[tokio::test]
async fn scenario_b_business_rejection() {
    let h = TestHarness::new();
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-2", 10)]).with_idempotency_key("b-1");

    let err = h.coordinator.submit(&ctx, request).await.unwrap_err();

    match &err {
        SubmitError::InventoryRejected { key: k, outcomes, .. } => {
            assert_eq!(k, &key("b-1"));
            assert_eq!(outcomes[0].status, ItemStatus::Insufficient);
            assert_eq!(outcomes[0].reason, "requested 10, available 1");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!err.is_retryable());

    // No persistence and no compensation
    assert_eq!(h.store.create_calls(), 0);
    assert_eq!(h.inventory.release_calls(), 0);
    assert_eq!(h.inventory.available("sku-2"), Some(1));
}

#[tokio::test]
async fn scenario_c_persistence_failure_is_compensated() {
    let h = TestHarness::new();
    h.store.set_fail_on_create(Some("connection reset"));
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("c-1");

    let err = h.coordinator.submit(&ctx, request).await.unwrap_err();

    assert_eq!(err.kind(), SubmitErrorKind::PersistenceFailure);
    assert_eq!(err.idempotency_key(), Some(&key("c-1")));

    // Released exactly once, under the same key
    assert_eq!(h.inventory.release_calls(), 1);
    assert!(!h.inventory.has_reservation(&key("c-1")));
    assert_eq!(h.inventory.available("sku-1"), Some(5));
    assert_eq!(h.store.order_count(), 0);
}

#[tokio::test]
async fn scenario_d_concurrent_duplicates_reserve_once() {
    let h = TestHarness::new();
    h.inventory.set_reserve_delay(Duration::from_millis(20));
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("d-1");

    let (first, second) = tokio::join!(
        h.coordinator.submit(&ctx, request.clone()),
        h.coordinator.submit(&ctx, request),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.id(), second.id());
    assert_eq!(h.inventory.reserve_calls(), 1);
    assert_eq!(h.inventory.deductions(), 1);
    assert_eq!(h.store.order_count(), 1);
}

#[tokio::test]
async fn sequential_duplicates_return_the_same_order() {
    let h = TestHarness::new();
    let ctx = SubmitContext::background();
    let items = vec![OrderItem::new("sku-1", 1), OrderItem::new("sku-2", 1)];

    // No explicit key: both requests derive the same one
    let first = h
        .coordinator
        .submit(&ctx, SubmitOrder::new(items.clone()))
        .await
        .unwrap();
    let second = h
        .coordinator
        .submit(&ctx, SubmitOrder::new(items.clone()))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.idempotency_key(), &IdempotencyKey::derive(&items));
    assert_eq!(h.inventory.reserve_calls(), 1);
    assert_eq!(h.inventory.available("sku-1"), Some(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_duplicates_collapse() {
    let h = Arc::new(TestHarness::new());
    h.inventory.set_reserve_delay(Duration::from_millis(5));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            let request =
                SubmitOrder::new(vec![OrderItem::new("sku-1", 1)]).with_idempotency_key("burst");
            h.coordinator
                .submit(&SubmitContext::background(), request)
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id());
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.inventory.reserve_calls(), 1);
    assert_eq!(h.store.order_count(), 1);
    assert_eq!(h.inventory.available("sku-1"), Some(4));
}

#[tokio::test]
async fn racing_coordinators_settle_on_one_order() {
    // Two instances sharing backends, as two processes would
    let inventory = InMemoryInventory::new().with_stock("sku-1", 5);
    inventory.set_reserve_delay(Duration::from_millis(20));
    let store = InMemoryOrderStore::new();
    let a = OrderSubmissionCoordinator::new(inventory.clone(), store.clone());
    let b = OrderSubmissionCoordinator::new(inventory.clone(), store.clone());
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("race");

    let (first, second) = tokio::join!(
        a.submit(&ctx, request.clone()),
        b.submit(&ctx, request),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.id(), second.id());
    assert_eq!(store.order_count(), 1);
    assert_eq!(store.create_calls(), 2);
    // Both reserved under one key; the inventory deducted once and the loser
    // did not release the winner's hold
    assert_eq!(inventory.deductions(), 1);
    assert_eq!(inventory.release_calls(), 0);
    assert_eq!(inventory.available("sku-1"), Some(3));
}

#[tokio::test]
async fn failed_release_requires_reconciliation() {
    let h = TestHarness::new();
    h.store.set_fail_on_create(Some("connection reset"));
    h.inventory
        .set_fail_on_release(Some(InventoryError::Exhausted {
            attempts: 4,
            reason: "Unavailable".into(),
        }));
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("r-1");

    let err = h.coordinator.submit(&ctx, request).await.unwrap_err();

    match &err {
        SubmitError::CompensationFailure { cause, release, .. } => {
            assert!(cause.contains("connection reset"));
            assert!(matches!(release, InventoryError::Exhausted { .. }));
        }
        other => panic!("expected compensation failure, got {other:?}"),
    }
    assert!(err.requires_reconciliation());
    assert_eq!(h.inventory.release_calls(), 1);
    assert!(h.inventory.has_reservation(&key("r-1")));
}

#[tokio::test]
async fn transient_inventory_failure_is_retryable() {
    let h = TestHarness::new();
    h.inventory.fail_next_reserves(1);
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("t-1");

    let err = h.coordinator.submit(&ctx, request.clone()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.store.create_calls(), 0);
    assert_eq!(h.inventory.release_calls(), 0);

    // The caller retries with the same key
    let order = h.coordinator.submit(&ctx, request).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Committed);
    assert_eq!(h.inventory.deductions(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_a_slow_reservation() {
    let h = TestHarness::new();
    h.inventory.set_reserve_delay(Duration::from_secs(5));
    let ctx = SubmitContext::background().with_timeout(Duration::from_millis(200));
    let started = tokio::time::Instant::now();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 1)]).with_idempotency_key("slow");

    let err = h.coordinator.submit(&ctx, request).await.unwrap_err();

    assert_eq!(err.kind(), SubmitErrorKind::InventoryUnavailable);
    assert!(started.elapsed() < Duration::from_millis(210));
    assert_eq!(h.store.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_reservation() {
    let h = TestHarness::new();
    h.inventory.set_reserve_delay(Duration::from_secs(1));
    let (ctx, handle) = SubmitContext::new();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 1)]).with_idempotency_key("x-1");

    let submit = h.coordinator.submit(&ctx, request);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    };
    let (result, ()) = tokio::join!(submit, cancel);

    assert!(matches!(result, Err(SubmitError::Cancelled)));
    assert_eq!(h.store.create_calls(), 0);
    assert_eq!(h.inventory.deductions(), 0);
}

/// Inventory that cancels the caller right after a successful reservation.
struct CancelAfterReserve {
    inner: InMemoryInventory,
    handle: CancelHandle,
}

#[async_trait]
impl InventoryPort for CancelAfterReserve {
    async fn reserve(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
        items: &[OrderItem],
    ) -> Result<Reservation, InventoryError> {
        let reservation = self.inner.reserve(ctx, key, items).await?;
        self.handle.cancel();
        Ok(reservation)
    }

    async fn release(&self, ctx: &SubmitContext, key: &IdempotencyKey) -> Result<(), InventoryError> {
        self.inner.release(ctx, key).await
    }
}

#[tokio::test]
async fn cancellation_after_reservation_still_releases() {
    let inventory = InMemoryInventory::new().with_stock("sku-1", 5);
    let store = InMemoryOrderStore::new();
    let (ctx, handle) = SubmitContext::new();
    let coordinator = OrderSubmissionCoordinator::with_config(
        CancelAfterReserve {
            inner: inventory.clone(),
            handle,
        },
        store.clone(),
        CoordinatorConfig {
            compensation_timeout: Duration::from_secs(1),
        },
    );
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 2)]).with_idempotency_key("late");

    let err = coordinator.submit(&ctx, request).await.unwrap_err();

    assert!(matches!(err, SubmitError::Cancelled));
    assert_eq!(store.create_calls(), 0);
    assert_eq!(inventory.release_calls(), 1);
    assert_eq!(inventory.available("sku-1"), Some(5));
}

/// Store whose `create` blocks on a concurrent winner, as a unique index wait
/// does, then reports the conflict.
struct SlowConflictStore {
    inner: InMemoryOrderStore,
    winner: Order,
    wait: Duration,
}

#[async_trait]
impl OrderStore for SlowConflictStore {
    async fn create(&self, _ctx: &SubmitContext, order: &Order) -> order_store::Result<Order> {
        tokio::time::sleep(self.wait).await;
        let background = SubmitContext::background();
        self.inner.create(&background, &self.winner).await?;
        self.inner.create(&background, order).await
    }

    async fn find_by_idempotency_key(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> order_store::Result<Option<Order>> {
        self.inner.find_by_idempotency_key(ctx, key).await
    }
}

#[tokio::test(start_paused = true)]
async fn conflict_after_deadline_returns_the_winner() {
    let inventory = InMemoryInventory::new().with_stock("sku-1", 5);
    let store = InMemoryOrderStore::new();
    let items = vec![OrderItem::new("sku-1", 2)];
    let mut winner = Order::new(key("slow-conflict"), items.clone()).unwrap();
    winner.transition(OrderStatus::InventoryReserved).unwrap();
    winner.transition(OrderStatus::Committed).unwrap();

    let coordinator = OrderSubmissionCoordinator::new(
        inventory.clone(),
        SlowConflictStore {
            inner: store.clone(),
            winner: winner.clone(),
            wait: Duration::from_millis(300),
        },
    );
    let ctx = SubmitContext::background().with_timeout(Duration::from_millis(200));
    let request = SubmitOrder::new(items).with_idempotency_key("slow-conflict");

    let order = coordinator.submit(&ctx, request).await.unwrap();

    assert_eq!(order.id(), winner.id());
    assert_eq!(store.order_count(), 1);
    assert_eq!(inventory.release_calls(), 0);
    assert_eq!(inventory.available("sku-1"), Some(3));
}

#[tokio::test]
async fn large_quantities_are_committed() {
    let inventory = InMemoryInventory::new().with_stock("sku-1", u32::MAX);
    let store = InMemoryOrderStore::new();
    let coordinator = OrderSubmissionCoordinator::new(inventory.clone(), store.clone());
    let ctx = SubmitContext::background();
    let request =
        SubmitOrder::new(vec![OrderItem::new("sku-1", 3_000_000_000)]).with_idempotency_key("bulk");

    let order = coordinator.submit(&ctx, request).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Committed);
    assert_eq!(inventory.release_calls(), 0);
    assert_eq!(store.get(&key("bulk")).unwrap().items()[0].quantity, 3_000_000_000);
}

/// Store that reports every key as taken but never finds it.
struct VanishingConflictStore;

#[async_trait]
impl OrderStore for VanishingConflictStore {
    async fn create(&self, _ctx: &SubmitContext, order: &Order) -> order_store::Result<Order> {
        Err(order_store::StoreError::Conflict {
            key: order.idempotency_key().clone(),
        })
    }

    async fn find_by_idempotency_key(
        &self,
        _ctx: &SubmitContext,
        _key: &IdempotencyKey,
    ) -> order_store::Result<Option<Order>> {
        Ok(None)
    }
}

#[tokio::test]
async fn unresolved_conflict_keeps_the_other_submission_reservation() {
    let inventory = InMemoryInventory::new().with_stock("sku-1", 5);
    let coordinator = OrderSubmissionCoordinator::new(inventory.clone(), VanishingConflictStore);
    let ctx = SubmitContext::background();
    let request = SubmitOrder::new(vec![OrderItem::new("sku-1", 1)]).with_idempotency_key("ghost");

    let err = coordinator.submit(&ctx, request).await.unwrap_err();

    assert_eq!(err.kind(), SubmitErrorKind::PersistenceFailure);
    assert!(!err.requires_reconciliation());
    assert_eq!(inventory.release_calls(), 0);
    assert!(inventory.has_reservation(&key("ghost")));
}
