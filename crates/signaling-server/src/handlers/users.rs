//! User handlers.

use crate::errors::SignalingError;
use crate::handlers::signaling::resolve_identity;
use crate::models::{CreateUserRequest, UserResponse};
use crate::routes::AppState;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "signaling.http.list_users")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, SignalingError> {
    let users = state.users.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Upsert a user. An empty `id` falls back to the caller's identity.
#[instrument(skip_all, name = "signaling.http.create_user")]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), SignalingError> {
    let user_id = if request.id.trim().is_empty() {
        resolve_identity(&headers, addr)
    } else {
        request.id
    };
    let user = state.users.create_user(&user_id, None).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

#[instrument(skip_all, name = "signaling.http.get_user", fields(user_id = %user_id))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, SignalingError> {
    let user = state.users.get_user(&user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[instrument(skip_all, name = "signaling.http.delete_user", fields(user_id = %user_id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, SignalingError> {
    state.users.delete_user(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
