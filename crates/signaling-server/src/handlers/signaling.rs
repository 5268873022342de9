//! WebSocket upgrade handler for `GET /ws/:room_id`.
//!
//! The caller's identity comes from the `X-User-ID` header, falling back to
//! the peer socket address. No authentication is performed.

use crate::errors::SignalingError;
use crate::routes::AppState;
use crate::signaling::connection::{run_writer, ConnectionHandle};
use crate::signaling::frame::SignalingFrame;
use crate::signaling::session::{run_session, SessionContext};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{future, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Header carrying a caller-asserted participant id.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Write buffer size for upgraded connections.
const SOCKET_BUFFER_BYTES: usize = 1024;

/// How long to wait for the writer to flush the close frame.
const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Participant identity for a request.
pub fn resolve_identity(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| addr.to_string())
}

#[instrument(skip_all, name = "signaling.http.ws", fields(room_id = %room_id))]
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let participant_id = resolve_identity(&headers, addr);
    debug!(target: "signaling.http", participant_id = %participant_id, "Upgrading connection");

    ws.write_buffer_size(SOCKET_BUFFER_BYTES)
        .on_failed_upgrade(|e| {
            warn!(target: "signaling.http", error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(state, socket, participant_id, room_id))
}

async fn handle_socket(state: Arc<AppState>, socket: WebSocket, participant_id: String, room_id: String) {
    let (sink, stream) = socket.split();
    let (connection, outbound) = ConnectionHandle::new();
    let writer = tokio::spawn(run_writer(sink, outbound));

    let reader = stream.filter_map(|message| future::ready(decode_message(message)));

    let ctx = SessionContext {
        rooms: Arc::clone(&state.rooms),
        users: Arc::clone(&state.users),
        heartbeat_interval: state.config.heartbeat_interval(),
        peer_send_timeout: state.config.peer_send_timeout(),
    };

    match run_session(
        ctx,
        participant_id.clone(),
        room_id.clone(),
        connection,
        reader,
        state.shutdown.child_token(),
    )
    .await
    {
        Ok(end) => {
            info!(target: "signaling.http", room_id = %room_id, participant_id = %participant_id, reason = end.as_str(), "Connection finished");
        }
        Err(e) => {
            info!(target: "signaling.http", room_id = %room_id, participant_id = %participant_id, error = %e, "Connection refused");
        }
    }

    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_SHUTDOWN_TIMEOUT, writer).await.is_err() {
        debug!(target: "signaling.http", "Writer did not finish, aborting");
        abort.abort();
    }
}

/// Map a socket message to a session input. Control frames yield nothing.
fn decode_message(
    message: Result<Message, axum::Error>,
) -> Option<Result<SignalingFrame, SignalingError>> {
    match message {
        Ok(Message::Text(text)) => Some(SignalingFrame::parse(&text)),
        Ok(Message::Binary(bytes)) => Some(
            std::str::from_utf8(&bytes)
                .map_err(|e| SignalingError::BadRequest(format!("binary frame is not utf-8: {e}")))
                .and_then(SignalingFrame::parse),
        ),
        Ok(Message::Close(frame)) => Some(Err(SignalingError::Transport(format!(
            "client closed connection: {:?}",
            frame.map(|f| f.code)
        )))),
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Err(e) => Some(Err(SignalingError::Transport(e.to_string()))),
    }
}
