//! Order submission service.
//!
//! Wires the submission coordinator to its production collaborators: a
//! PostgreSQL order store and the remote inventory service over gRPC.
//! Every submission runs under a per-request deadline derived from a root
//! context that is cancelled on shutdown.

pub mod config;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use common::{CancelHandle, SubmitContext};
use domain::Order;
use inventory::{GrpcInventoryPort, InventoryPort};
use metrics_exporter_prometheus::BuildError;
use order_store::{OrderStore, PostgresOrderStore, StoreError};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use submission::{OrderSubmissionCoordinator, SubmitError, SubmitOrder};
use thiserror::Error;
use tonic::transport::Endpoint;

pub use config::{Config, ConfigError, LogFormat};

/// Errors that stop the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The database could not be reached.
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    /// Migrations could not be applied.
    #[error("Order store setup failed: {0}")]
    Store(#[from] StoreError),

    /// The inventory endpoint could not be built.
    #[error("Inventory endpoint invalid: {0}")]
    Inventory(#[from] tonic::transport::Error),

    /// The metrics exporter could not be installed.
    #[error("Metrics exporter failed: {0}")]
    Metrics(#[from] BuildError),
}

/// Entry point for submitting orders.
///
/// Each call gets its own deadline; cancelling the root context aborts all
/// in-flight calls.
pub struct SubmissionService<I, S>
where
    I: InventoryPort,
    S: OrderStore,
{
    coordinator: Arc<OrderSubmissionCoordinator<I, S>>,
    root: SubmitContext,
    submit_timeout: Duration,
}

impl<I, S> Clone for SubmissionService<I, S>
where
    I: InventoryPort,
    S: OrderStore,
{
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            root: self.root.clone(),
            submit_timeout: self.submit_timeout,
        }
    }
}

impl<I, S> SubmissionService<I, S>
where
    I: InventoryPort,
    S: OrderStore,
{
    /// Creates a service whose requests derive from `root`.
    pub fn new(
        coordinator: OrderSubmissionCoordinator<I, S>,
        root: SubmitContext,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            root,
            submit_timeout,
        }
    }

    /// Submits an order under the configured per-request timeout.
    pub async fn submit(&self, request: SubmitOrder) -> Result<Order, SubmitError> {
        let ctx = self.root.with_timeout(self.submit_timeout);
        self.coordinator.submit(&ctx, request).await
    }
}

/// Submission service backed by PostgreSQL and the remote inventory service.
pub type OrderService = SubmissionService<GrpcInventoryPort, PostgresOrderStore>;

/// A running service and the resources it owns.
pub struct App {
    pub service: OrderService,
    pool: PgPool,
    shutdown: CancelHandle,
}

impl App {
    /// Connects to the database, applies migrations and prepares the
    /// inventory channel.
    ///
    /// The inventory channel connects lazily, so an unreachable inventory
    /// service does not block startup.
    #[tracing::instrument(skip_all)]
    pub async fn connect(config: &Config) -> Result<Self, StartupError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        let store = PostgresOrderStore::new(pool.clone());
        store.run_migrations().await?;
        tracing::info!("database migrations applied");

        let channel = Endpoint::from_shared(config.inventory_addr.clone())?.connect_lazy();
        let inventory = GrpcInventoryPort::new(channel, config.retry_policy());

        let coordinator =
            OrderSubmissionCoordinator::with_config(inventory, store, config.coordinator_config());
        let (root, shutdown) = SubmitContext::new();

        Ok(Self {
            service: SubmissionService::new(coordinator, root, config.submit_timeout),
            pool,
            shutdown,
        })
    }

    /// Cancels in-flight submissions and closes the database pool.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.pool.close().await;
    }
}
