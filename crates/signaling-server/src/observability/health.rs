//! Health endpoints.
//!
//! - `GET /health` - Liveness probe, always `{"status":"ok"}` while the process runs
//! - `GET /ready` - Readiness probe, 200 only while accepting sessions
//!
//! The `/metrics` endpoint is served by the main router.

use crate::models::HealthResponse;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Where the server is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerPhase {
    /// Listener not bound yet.
    Starting = 0,
    Accepting = 1,
    /// Shutdown requested; sessions are being cancelled.
    Draining = 2,
}

impl ServerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerPhase::Starting => "starting",
            ServerPhase::Accepting => "ready",
            ServerPhase::Draining => "draining",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServerPhase::Accepting,
            2 => ServerPhase::Draining,
            _ => ServerPhase::Starting,
        }
    }
}

/// Lifecycle phase shared between `main`, the router and the test harness.
#[derive(Debug)]
pub struct HealthState {
    phase: AtomicU8,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(ServerPhase::Starting as u8),
        }
    }

    /// The listener is bound; route sessions here.
    pub fn start_accepting(&self) {
        self.phase.store(ServerPhase::Accepting as u8, Ordering::SeqCst);
    }

    /// Shutdown has begun. Never leaves this phase.
    pub fn start_draining(&self) {
        self.phase.store(ServerPhase::Draining as u8, Ordering::SeqCst);
    }

    #[must_use]
    pub fn phase(&self) -> ServerPhase {
        ServerPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.phase() == ServerPhase::Accepting
    }
}

/// Create the health router with liveness and readiness endpoints.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

async fn liveness_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn readiness_handler(
    State(state): State<Arc<HealthState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let phase = state.phase();
    let status = if phase == ServerPhase::Accepting {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: phase.as_str().to_string(),
        }),
    )
}
