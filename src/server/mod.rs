//! HTTP server module
//!
//! Provides the Axum-based HTTP server for serving metrics.

pub mod handlers;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::collector::{GenericCollector, PoolCollector, ServerInfo};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::jmx::MBeanServer;
use crate::jolokia::JolokiaClient;
use crate::registry::Registry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Metric registry with the configured collectors
    pub registry: Arc<Registry>,
}

/// Validate the configuration and create the Jolokia client
pub fn connect(config: &Config) -> AppResult<Arc<dyn MBeanServer>> {
    config.validate()?;

    let mut client = JolokiaClient::new(&config.jolokia.url, config.jolokia.timeout_ms)?;
    if let (Some(ref username), Some(ref password)) =
        (&config.jolokia.username, &config.jolokia.password)
    {
        client = client.with_auth(username, password);
    }

    Ok(Arc::new(client))
}

/// Create a registry with the collectors enabled in `config`
pub fn build_registry(config: &Config, server: Arc<dyn MBeanServer>) -> Arc<Registry> {
    let registry = Registry::new();
    let exporter = &config.exporter;
    let domain = exporter.runtime_domain();

    if exporter.pools {
        registry.register(Arc::new(PoolCollector::new(
            Arc::clone(&server),
            &exporter.namespace,
            domain,
        )));
    }

    if exporter.generic {
        let mut collector = GenericCollector::new(Arc::clone(&server), &exporter.namespace, domain);
        if let Some(ref info) = exporter.server_info {
            collector = collector.with_server_info(ServerInfo::from(info));
        }
        registry.register(Arc::new(collector));
    }

    info!(
        collectors = registry.collector_count(),
        namespace = %exporter.namespace,
        domain = %domain,
        "Registry initialized"
    );

    Arc::new(registry)
}

/// Build the router for `state`
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse a bind address; "localhost" maps to the IPv4 loopback
pub fn parse_bind_address(bind_address: &str) -> AppResult<IpAddr> {
    if bind_address == "localhost" {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    bind_address.parse().map_err(|e| {
        AppError::Internal(format!(
            "Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.",
            bind_address, e
        ))
    })
}

/// Run the HTTP server
///
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start
pub async fn run(config: Config) -> Result<()> {
    let server = connect(&config)?;
    let registry = build_registry(&config, server);

    let bind_addr = parse_bind_address(&config.server.bind_address)?;
    let addr = SocketAddr::from((bind_addr, config.server.port));
    let metrics_path = config.server.path.clone();

    let state = AppState {
        config: Arc::new(config),
        registry,
    };
    let app = router(state);

    info!(address = %addr, metrics_path = %metrics_path, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
