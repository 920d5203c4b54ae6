//! Startup sequence.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Build the server from a validated config
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Ordered startup: metrics, then routes, then listener
//! - Any failure aborts startup before the listener accepts connections

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::RouterConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::metrics;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Start every subsystem and serve until a shutdown signal arrives.
pub async fn start(config: RouterConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefix = %config.prefix,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let address = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(address)?;
    }

    let server = HttpServer::new(config)?;
    let address = server.config().listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    server.run(listener, shutdown_signal()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
