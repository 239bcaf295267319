//! Order submission coordinator.

use std::time::Duration;

use common::{ContextError, SubmitContext};
use domain::{IdempotencyKey, Order, OrderStatus};
use inventory::{InventoryError, InventoryPort};
use order_store::{OrderStore, StoreError};
use thiserror::Error;

use crate::error::SubmitError;
use crate::inflight::InFlight;
use crate::request::SubmitOrder;

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Budget for releasing a reservation after a failed submission.
    ///
    /// Runs independently of the caller's context.
    pub compensation_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            compensation_timeout: Duration::from_secs(10),
        }
    }
}

/// Why a reserved submission is being rolled back.
#[derive(Debug, Error)]
enum Abort {
    #[error("request aborted: {0}")]
    Context(ContextError),

    #[error(transparent)]
    Persistence(StoreError),
}

impl Abort {
    fn into_error(self, key: IdempotencyKey) -> SubmitError {
        match self {
            Abort::Context(_) => SubmitError::Cancelled,
            Abort::Persistence(source) => SubmitError::PersistenceFailure { key, source },
        }
    }
}

/// Submits orders: reserves inventory, then persists the committed order,
/// releasing the reservation if persistence fails.
///
/// Submissions are idempotent by key. A key already persisted returns the
/// stored order without touching inventory, and concurrent submissions of the
/// same key inside one coordinator run one after another.
pub struct OrderSubmissionCoordinator<I, S>
where
    I: InventoryPort,
    S: OrderStore,
{
    inventory: I,
    store: S,
    config: CoordinatorConfig,
    in_flight: InFlight,
}

impl<I, S> OrderSubmissionCoordinator<I, S>
where
    I: InventoryPort,
    S: OrderStore,
{
    /// Creates a coordinator with default settings.
    pub fn new(inventory: I, store: S) -> Self {
        Self::with_config(inventory, store, CoordinatorConfig::default())
    }

    /// Creates a coordinator with explicit settings.
    pub fn with_config(inventory: I, store: S, config: CoordinatorConfig) -> Self {
        Self {
            inventory,
            store,
            config,
            in_flight: InFlight::default(),
        }
    }

    /// Submits an order.
    ///
    /// Returns the committed order, which is the previously stored one when
    /// the key was already submitted.
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(key = tracing::field::Empty, items = request.items.len())
    )]
    pub async fn submit(
        &self,
        ctx: &SubmitContext,
        request: SubmitOrder,
    ) -> Result<Order, SubmitError> {
        metrics::counter!("order_submissions_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.run(ctx, request).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("order_submission_duration_seconds").record(duration);
        match &result {
            Ok(order) => {
                tracing::info!(order_id = %order.id(), duration, "order submitted");
            }
            Err(e) => {
                metrics::counter!("order_submissions_failed", "kind" => e.kind().as_str())
                    .increment(1);
                if e.requires_reconciliation() {
                    tracing::error!(error = %e, "order submission needs reconciliation");
                } else {
                    tracing::warn!(error = %e, kind = %e.kind(), "order submission failed");
                }
            }
        }
        result
    }

    async fn run(&self, ctx: &SubmitContext, request: SubmitOrder) -> Result<Order, SubmitError> {
        // 1. Validate before any remote call
        let key = request.resolve_key()?;
        tracing::Span::current().record("key", key.as_str());
        let mut order = Order::new(key.clone(), request.items)?;

        // 2. Serialize with in-flight submissions of the same key
        let _guard = ctx
            .run(self.in_flight.acquire(&key))
            .await
            .map_err(|e| context_error(&key, e))?;

        // 3. Already committed?
        match self.store.find_by_idempotency_key(ctx, &key).await {
            Ok(Some(existing)) => {
                tracing::info!(order_id = %existing.id(), "order already submitted");
                return Ok(existing);
            }
            Ok(None) => {}
            Err(StoreError::Context(e)) => return Err(context_error(&key, e)),
            Err(source) => return Err(SubmitError::PersistenceFailure { key, source }),
        }

        // 4. Reserve inventory
        match self.inventory.reserve(ctx, &key, order.items()).await {
            Ok(reservation) => {
                order.transition(OrderStatus::InventoryReserved)?;
                tracing::debug!(outcomes = reservation.outcomes.len(), "inventory reserved");
            }
            Err(err) => {
                order.transition(OrderStatus::Failed)?;
                return Err(match err {
                    InventoryError::Rejected { reason, outcomes } => {
                        SubmitError::InventoryRejected {
                            key,
                            reason,
                            outcomes,
                        }
                    }
                    InventoryError::Cancelled => SubmitError::Cancelled,
                    source => SubmitError::InventoryUnavailable { key, source },
                });
            }
        }

        if let Err(e) = ctx.check() {
            return Err(self.compensate(&mut order, Abort::Context(e)).await?);
        }

        // 5. Persist the committed record
        let mut record = order.clone();
        record.transition(OrderStatus::Committed)?;

        match self.store.create(ctx, &record).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::Conflict { .. }) => self.resolve_conflict(key).await,
            Err(StoreError::Context(e)) => {
                Err(self.compensate(&mut order, Abort::Context(e)).await?)
            }
            Err(source) => {
                let recovery = SubmitContext::detached(self.config.compensation_timeout);
                if let Ok(Some(existing)) = self.store.find_by_idempotency_key(&recovery, &key).await
                {
                    tracing::warn!(
                        order_id = %existing.id(),
                        error = %source,
                        "create reported failure but order is stored, keeping reservation"
                    );
                    return Ok(existing);
                }
                Err(self
                    .compensate(&mut order, Abort::Persistence(source))
                    .await?)
            }
        }
    }

    /// Another submission persisted the key first; its order owns the
    /// reservation, so nothing is released.
    ///
    /// The lookup runs under its own budget: the order is committed even when
    /// the caller's deadline passed while `create` waited on the winner.
    async fn resolve_conflict(&self, key: IdempotencyKey) -> Result<Order, SubmitError> {
        tracing::debug!("order persisted concurrently, loading it");
        let lookup = SubmitContext::detached(self.config.compensation_timeout);
        match self.store.find_by_idempotency_key(&lookup, &key).await {
            Ok(Some(existing)) => Ok(existing),
            Ok(None) => Err(SubmitError::PersistenceFailure {
                source: StoreError::Conflict { key: key.clone() },
                key,
            }),
            Err(source) => Err(SubmitError::PersistenceFailure { key, source }),
        }
    }

    /// Releases the reservation held under the order's key.
    ///
    /// Returns the error to report to the caller. The outer `Result` only
    /// carries state machine violations.
    #[tracing::instrument(skip(self, order, abort), fields(key = %order.idempotency_key(), cause = %abort))]
    async fn compensate(&self, order: &mut Order, abort: Abort) -> Result<SubmitError, SubmitError> {
        metrics::counter!("order_compensations_total").increment(1);
        order.transition(OrderStatus::Compensating)?;

        let key = order.idempotency_key().clone();
        let ctx = SubmitContext::detached(self.config.compensation_timeout);
        let released = self.inventory.release(&ctx, &key).await;
        order.transition(OrderStatus::Failed)?;

        match released {
            Ok(()) => {
                tracing::info!("reservation released");
                Ok(abort.into_error(key))
            }
            Err(release) => {
                tracing::error!(error = %release, "failed to release reservation");
                Ok(SubmitError::CompensationFailure {
                    key,
                    cause: abort.to_string(),
                    release,
                })
            }
        }
    }
}

/// Maps a context failure before inventory was touched.
fn context_error(key: &IdempotencyKey, err: ContextError) -> SubmitError {
    match err {
        ContextError::Cancelled => SubmitError::Cancelled,
        ContextError::DeadlineExceeded => SubmitError::InventoryUnavailable {
            key: key.clone(),
            source: InventoryError::Exhausted {
                attempts: 0,
                reason: err.to_string(),
            },
        },
    }
}
