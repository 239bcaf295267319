//! Order service entry point.

use server::{App, Config, StartupError, telemetry};
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // 1. Load configuration
    let config = Config::from_env()?;

    // 2. Initialize tracing
    telemetry::init_tracing(&config.log_level, config.log_format);

    // 3. Install Prometheus metrics recorder
    telemetry::install_metrics(config.metrics_addr)?;

    // 4. Connect the store and inventory, build the coordinator
    let app = App::connect(&config).await?;
    tracing::info!(
        inventory = %config.inventory_addr,
        submit_timeout_ms = config.submit_timeout.as_millis() as u64,
        "order service ready"
    );

    // 5. Run until asked to stop
    shutdown_signal().await;
    app.shutdown().await;

    tracing::info!("order service shut down gracefully");
    Ok(())
}
