//! Signaling Server
//!
//! Entry point for the duocall two-party signaling service.

use metrics_exporter_prometheus::PrometheusBuilder;
use signaling_server::config::Config;
use signaling_server::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signaling_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting signaling server");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        heartbeat_interval_seconds = config.heartbeat_interval_seconds,
        room_grace_period_seconds = config.room_grace_period_seconds,
        peer_send_timeout_ms = config.peer_send_timeout_ms,
        "Configuration loaded successfully"
    );

    // Install the global metrics recorder
    let metrics_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        error!("Failed to install Prometheus recorder: {}", e);
        e
    })?;

    let drain_seconds = config.shutdown_drain_seconds;
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState::in_memory(config, metrics_handle));
    let app = routes::build_routes(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    state.health.start_accepting();
    info!("Signaling server listening on {}", addr);

    let shutdown_state = Arc::clone(&state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        shutdown_state.health.start_draining();
        // Sessions leave their rooms and close their sockets.
        shutdown_state.shutdown.cancel();
        drain(drain_seconds).await;
    })
    .await?;

    info!("Signaling server shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Graceful shutdown drain period.
async fn drain(drain_seconds: u64) {
    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (SHUTDOWN_DRAIN_SECONDS=0)");
    }
}
