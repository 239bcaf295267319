//! Logging and metrics setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogFormat;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_tracing(default_level: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (text, json) = match format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Installs the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn install_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    tracing::info!(%addr, "metrics listener started");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("order_submissions_total", "Order submissions received");
    metrics::describe_counter!(
        "order_submissions_failed",
        "Order submissions that returned an error, by kind"
    );
    metrics::describe_counter!(
        "order_compensations_total",
        "Reservations released after a failed submission"
    );
    metrics::describe_histogram!(
        "order_submission_duration_seconds",
        metrics::Unit::Seconds,
        "End-to-end order submission latency"
    );
    metrics::describe_counter!(
        "inventory_rpc_attempts_total",
        "Inventory RPC attempts, by operation"
    );
    metrics::describe_counter!(
        "inventory_rpc_retries_total",
        "Inventory RPC retries after transient failures, by operation"
    );
    metrics::describe_counter!("order_store_writes_total", "Orders written to the store");
}
