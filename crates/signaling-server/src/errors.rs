//! Signaling server error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and to
//! WebSocket close codes via [`SignalingError::close_code`]. Messages returned
//! to clients for internal failures are generic; details are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// Close code sent when the room does not exist.
pub const CLOSE_ROOM_NOT_FOUND: u16 = 4404;

/// Close code sent when the room has no free slot for this participant.
pub const CLOSE_ROOM_UNAVAILABLE: u16 = 4409;

/// Close code sent when the room is past its grace window.
pub const CLOSE_ROOM_EXPIRED: u16 = 4410;

/// Standard WebSocket "internal error" close code.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Signaling server error type.
///
/// Maps to HTTP status codes:
/// - NotFound: 404 Not Found
/// - RoomFull, NotInRoom, AlreadyInRoom: 409 Conflict
/// - RoomExpired: 410 Gone
/// - BadRequest: 400 Bad Request
/// - Transport: 502 Bad Gateway
/// - PeerTimeout: 504 Gateway Timeout
/// - IdentityResolution, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Room is full: {0}")]
    RoomFull(String),

    #[error("Room has expired: {0}")]
    RoomExpired(String),

    #[error("Participant {participant_id} is not in room {room_id}")]
    NotInRoom {
        room_id: String,
        participant_id: String,
    },

    #[error("Participant {participant_id} is already in room {room_id}")]
    AlreadyInRoom {
        room_id: String,
        participant_id: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Peer send timed out: {0}")]
    PeerTimeout(String),

    #[error("Failed to resolve participant: {0}")]
    IdentityResolution(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignalingError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SignalingError::NotFound(_) => 404,
            SignalingError::RoomFull(_)
            | SignalingError::NotInRoom { .. }
            | SignalingError::AlreadyInRoom { .. } => 409,
            SignalingError::RoomExpired(_) => 410,
            SignalingError::BadRequest(_) => 400,
            SignalingError::Transport(_) => 502,
            SignalingError::PeerTimeout(_) => 504,
            SignalingError::IdentityResolution(_) | SignalingError::Internal(_) => 500,
        }
    }

    /// Returns the WebSocket close code used when a session is refused or aborted.
    pub fn close_code(&self) -> u16 {
        match self {
            SignalingError::NotFound(_) => CLOSE_ROOM_NOT_FOUND,
            SignalingError::RoomFull(_) | SignalingError::AlreadyInRoom { .. } => {
                CLOSE_ROOM_UNAVAILABLE
            }
            SignalingError::RoomExpired(_) => CLOSE_ROOM_EXPIRED,
            _ => CLOSE_INTERNAL_ERROR,
        }
    }

    /// Returns a bounded error label for metrics and logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            SignalingError::NotFound(_) => "not_found",
            SignalingError::RoomFull(_) => "room_full",
            SignalingError::RoomExpired(_) => "room_expired",
            SignalingError::NotInRoom { .. } => "not_in_room",
            SignalingError::AlreadyInRoom { .. } => "already_in_room",
            SignalingError::Transport(_) => "transport",
            SignalingError::PeerTimeout(_) => "peer_timeout",
            SignalingError::IdentityResolution(_) => "identity_resolution",
            SignalingError::BadRequest(_) => "bad_request",
            SignalingError::Internal(_) => "internal",
        }
    }

    /// Message that is safe to send to clients (close reasons, HTTP bodies).
    pub fn client_message(&self) -> String {
        match self {
            SignalingError::Transport(_)
            | SignalingError::IdentityResolution(_)
            | SignalingError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for SignalingError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            // Log actual error server-side, return generic message to client
            tracing::error!(target: "signaling.http", error = %self, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.error_type().to_uppercase(),
                message: self.client_message(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert repository errors to SignalingError
impl From<RepositoryError> for SignalingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(key) => SignalingError::NotFound(key),
            RepositoryError::Backend(msg) => SignalingError::Internal(msg),
        }
    }
}
