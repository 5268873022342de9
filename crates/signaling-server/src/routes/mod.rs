//! HTTP routes for the signaling server.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::observability::{health_router, HealthState};
use crate::services::{RoomService, UserService};
use axum::{routing::get, Router};
use common::repository::InMemoryRepository;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Room lifecycle manager.
    pub rooms: Arc<RoomService>,

    /// User registry.
    pub users: Arc<UserService>,

    /// Liveness/readiness flags.
    pub health: Arc<HealthState>,

    /// Renders the Prometheus scrape output.
    pub metrics_handle: PrometheusHandle,

    /// Cancelled on shutdown; every session holds a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build state with fresh in-memory room and user stores.
    pub fn in_memory(config: Config, metrics_handle: PrometheusHandle) -> Self {
        let rooms = RoomService::new(
            Arc::new(InMemoryRepository::new()),
            config.room_grace_period(),
        );
        let users = UserService::new(Arc::new(InMemoryRepository::new()));

        Self {
            config,
            rooms: Arc::new(rooms),
            users: Arc::new(users),
            health: Arc::new(HealthState::new()),
            metrics_handle,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - Probes
/// - `/metrics` - Prometheus scrape endpoint
/// - `/rooms`, `/rooms/:room_id` - Room CRUD
/// - `/users`, `/users/:user_id` - User registry
/// - `/ws/:room_id` - Signaling WebSocket
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/rooms",
            get(handlers::list_rooms).post(handlers::create_room),
        )
        .route(
            "/rooms/:room_id",
            get(handlers::get_room).delete(handlers::delete_room),
        )
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:user_id",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/ws/:room_id", get(handlers::ws_handler))
        .with_state(Arc::clone(&state));

    // Apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    api_routes
        .merge(health_router(Arc::clone(&state.health)))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
