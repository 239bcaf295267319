//! Inventory port backed by the remote `EdibleInventoryService`.

use std::time::Duration;

use async_trait::async_trait;
use common::SubmitContext;
use domain::{IdempotencyKey, OrderItem, ProductId};
use tonic::transport::Channel;
use tonic::{Code, Status};

use crate::proto::{self, EdibleInventoryServiceClient};
use crate::reservation::describe_rejection;
use crate::{InventoryError, InventoryPort, ItemOutcome, ItemStatus, Reservation, RetryPolicy};

/// gRPC client for the inventory service with retry and error translation.
///
/// Cloning is cheap; clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct GrpcInventoryPort {
    client: EdibleInventoryServiceClient<Channel>,
    retry: RetryPolicy,
}

impl GrpcInventoryPort {
    /// Creates a port over an established (or lazily connecting) channel.
    pub fn new(channel: Channel, retry: RetryPolicy) -> Self {
        Self {
            client: EdibleInventoryServiceClient::new(channel),
            retry,
        }
    }

    async fn use_once(
        &self,
        request: proto::InventoryUseRequest,
        timeout: Option<Duration>,
    ) -> Result<proto::InventoryUseResponse, InventoryError> {
        let mut client = self.client.clone();
        let mut request = tonic::Request::new(request);
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        client
            .use_inventory(request)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| classify(&status))
    }

    async fn release_once(
        &self,
        request: proto::InventoryReleaseRequest,
        timeout: Option<Duration>,
    ) -> Result<(), InventoryError> {
        let mut client = self.client.clone();
        let mut request = tonic::Request::new(request);
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        match client.release(request).await {
            Ok(response) => {
                if !response.into_inner().released {
                    tracing::debug!("inventory reported nothing to release");
                }
                Ok(())
            }
            Err(status) if status.code() == Code::NotFound => {
                tracing::debug!("no reservation to release");
                Ok(())
            }
            Err(status) => Err(classify(&status)),
        }
    }
}

#[async_trait]
impl InventoryPort for GrpcInventoryPort {
    #[tracing::instrument(skip(self, ctx, items), fields(key = %key, items = items.len()))]
    async fn reserve(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
        items: &[OrderItem],
    ) -> Result<Reservation, InventoryError> {
        let request = proto::InventoryUseRequest {
            items: items
                .iter()
                .map(|item| proto::InventoryItem {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                })
                .collect(),
            idempotency_key: key.to_string(),
        };

        let response = self
            .retry
            .run(ctx, "reserve", |timeout| {
                self.use_once(request.clone(), timeout)
            })
            .await?;

        let outcomes: Vec<ItemOutcome> = response.outcomes.iter().map(outcome_from_wire).collect();
        if !response.success {
            return Err(InventoryError::Rejected {
                reason: describe_rejection(&outcomes),
                outcomes,
            });
        }

        Ok(Reservation {
            idempotency_key: key.clone(),
            outcomes,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(key = %key))]
    async fn release(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<(), InventoryError> {
        let request = proto::InventoryReleaseRequest {
            idempotency_key: key.to_string(),
        };

        self.retry
            .run(ctx, "release", |timeout| {
                self.release_once(request.clone(), timeout)
            })
            .await
    }
}

/// Maps a gRPC status onto the inventory error taxonomy.
pub fn classify(status: &Status) -> InventoryError {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::ResourceExhausted => {
            InventoryError::Transient(format!("{:?}: {}", status.code(), status.message()))
        }
        Code::InvalidArgument | Code::FailedPrecondition | Code::NotFound => {
            InventoryError::Rejected {
                reason: status.message().to_string(),
                outcomes: Vec::new(),
            }
        }
        code => InventoryError::Remote(format!("{code:?}: {}", status.message())),
    }
}

fn outcome_from_wire(outcome: &proto::ItemOutcome) -> ItemOutcome {
    let status = match proto::ItemStatus::try_from(outcome.status) {
        Ok(proto::ItemStatus::Reserved) => ItemStatus::Reserved,
        Ok(proto::ItemStatus::UnknownProduct) => ItemStatus::UnknownProduct,
        // An unrecognised status is never treated as a successful hold.
        Ok(proto::ItemStatus::Insufficient | proto::ItemStatus::Unspecified) | Err(_) => {
            ItemStatus::Insufficient
        }
    };
    ItemOutcome::new(
        ProductId::new(outcome.product_id.clone()),
        status,
        outcome.reason.clone(),
    )
}
