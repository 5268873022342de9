//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it. Labels carry no room or
//! participant ids.

use crate::routes::AppState;
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

/// Handler for GET /metrics
#[tracing::instrument(skip_all, name = "signaling.metrics.scrape")]
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics_handle.render()
}
