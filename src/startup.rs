//! Exporter startup and server initialization.

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::metrics::StorageMetrics;
use crate::routes;
use crate::state::AppState;

/// Serves the storage metrics over HTTP until Ctrl-C is received.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the configured address
/// or encounters a runtime error while serving.
pub async fn run(
    config: &ConfigV1,
    metrics: StorageMetrics,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState { metrics };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!(address = %listener.local_addr()?, "Serving storage metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Metrics exporter shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
