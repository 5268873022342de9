//! Room handlers.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | GET | `/rooms?owner_id=` | 200, rooms oldest first |
//! | POST | `/rooms` | 201, created room |
//! | GET | `/rooms/:room_id` | 200 or 404 |
//! | DELETE | `/rooms/:room_id` | 204 or 404 |
//!
//! Listing may delete rooms that are past their grace window.

use crate::errors::SignalingError;
use crate::models::{CreateRoomRequest, ListRoomsQuery, Room};
use crate::routes::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "signaling.http.list_rooms")]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRoomsQuery>,
) -> Result<Json<Vec<Room>>, SignalingError> {
    let rooms = state.rooms.list_own_rooms(&query.owner_id).await?;
    Ok(Json(rooms))
}

#[instrument(skip_all, name = "signaling.http.create_room")]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), SignalingError> {
    let room = state.rooms.create_room(request).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[instrument(skip_all, name = "signaling.http.get_room", fields(room_id = %room_id))]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Room>, SignalingError> {
    Ok(Json(state.rooms.get_room(&room_id).await?))
}

#[instrument(skip_all, name = "signaling.http.delete_room", fields(room_id = %room_id))]
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<StatusCode, SignalingError> {
    state.rooms.delete_room(&room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
