//! Per-connection signaling session.
//!
//! A session seats its participant in a room, then multiplexes four sources
//! until one of them ends it:
//!
//! - cancellation (server shutdown)
//! - room events from the participant's subscriber queue
//! - client frames from the read task
//! - the heartbeat tick
//!
//! # Lifecycle
//!
//! 1. Connect: upsert the user with this connection, join the room. A failure
//!    restores the user's previous connection, closes the socket with a code
//!    describing why and returns the error.
//! 2. Relay: `offer`/`answer`/`candidate` frames go to the peer's connection.
//! 3. Teardown (every exit path): stop the reader, leave the room, close the
//!    socket, clear the user's connection handle.
//!
//! The peer reference is owned by the loop alone; the read task only hands
//! frames over through a single-slot queue.

use crate::errors::SignalingError;
use crate::observability::metrics;
use crate::services::{RoomService, UserService};
use crate::signaling::connection::ConnectionHandle;
use crate::signaling::frame::{FrameKind, SignalingFrame};
use crate::models::RoomEvent;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Capacity of the queue between the read task and the loop.
const CLIENT_FRAME_QUEUE_CAPACITY: usize = 1;

/// WebSocket close code for a normal end of session.
const CLOSE_NORMAL: u16 = 1000;

/// WebSocket close code used when the server is going away.
const CLOSE_GOING_AWAY: u16 = 1001;

/// Shared dependencies of every session.
#[derive(Clone)]
pub struct SessionContext {
    pub rooms: Arc<RoomService>,
    pub users: Arc<UserService>,
    pub heartbeat_interval: Duration,
    pub peer_send_timeout: Duration,
}

/// Why a session stopped relaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Cancelled,
    ReadFailed,
    RoomDeleted,
    RoomClosed,
    HeartbeatFailed,
    PeerResolutionFailed,
}

impl SessionEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::Cancelled => "cancelled",
            SessionEnd::ReadFailed => "read_failed",
            SessionEnd::RoomDeleted => "room_deleted",
            SessionEnd::RoomClosed => "room_closed",
            SessionEnd::HeartbeatFailed => "heartbeat_failed",
            SessionEnd::PeerResolutionFailed => "peer_resolution_failed",
        }
    }

    fn close_code(&self) -> u16 {
        match self {
            SessionEnd::Cancelled => CLOSE_GOING_AWAY,
            SessionEnd::ReadFailed | SessionEnd::RoomDeleted | SessionEnd::RoomClosed => {
                CLOSE_NORMAL
            }
            SessionEnd::HeartbeatFailed | SessionEnd::PeerResolutionFailed => {
                crate::errors::CLOSE_INTERNAL_ERROR
            }
        }
    }
}

/// Run one signaling session to completion.
///
/// `reader` yields decoded client frames. A `BadRequest` item is skipped;
/// any other error, or the end of the stream, ends the session.
#[instrument(skip_all, name = "signaling.session", fields(room_id = %room_id, participant_id = %participant_id))]
pub async fn run_session<R>(
    ctx: SessionContext,
    participant_id: String,
    room_id: String,
    connection: ConnectionHandle,
    reader: R,
    cancel: CancellationToken,
) -> Result<SessionEnd, SignalingError>
where
    R: Stream<Item = Result<SignalingFrame, SignalingError>> + Send + Unpin + 'static,
{
    // Connect phase
    let joined = match connect(&ctx, &participant_id, &room_id, &connection).await {
        Ok(joined) => joined,
        Err(e) => {
            warn!(target: "signaling.session", error = %e, "Session refused");
            metrics::record_session_rejected(e.error_type());
            connection.close(e.close_code(), e.client_message());
            return Err(e);
        }
    };

    let mut session = Session {
        ctx,
        participant_id,
        room_id,
        connection,
        peer: None,
        joined: true,
    };

    if let Some(peer_id) = joined.peer_id.as_deref() {
        match session.resolve_peer(peer_id).await {
            Ok(peer) => session.peer = peer,
            Err(e) => {
                warn!(target: "signaling.session", peer_id = %peer_id, error = %e, "Could not resolve existing occupant, waiting for events");
            }
        }
    }

    let (frame_tx, frames) = mpsc::channel(CLIENT_FRAME_QUEUE_CAPACITY);
    let read_task = tokio::spawn(read_frames(reader, frame_tx));

    info!(target: "signaling.session", has_peer = session.peer.is_some(), "Session started");
    metrics::record_session_started();
    let started = Instant::now();

    let end = session.relay_loop(joined.events, frames, &cancel).await;

    read_task.abort();
    session.teardown(end).await;

    let elapsed = started.elapsed();
    metrics::record_session_ended(end.as_str(), elapsed);
    info!(
        target: "signaling.session",
        reason = end.as_str(),
        duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Session ended"
    );

    Ok(end)
}

async fn connect(
    ctx: &SessionContext,
    participant_id: &str,
    room_id: &str,
    connection: &ConnectionHandle,
) -> Result<crate::services::JoinedRoom, SignalingError> {
    let previous = ctx.users.live_connection(participant_id).await?;
    ctx.users
        .create_user(participant_id, Some(connection.clone()))
        .await?;

    match ctx.rooms.join_room(room_id, participant_id).await {
        Ok(joined) => Ok(joined),
        Err(e) => {
            // Hand the record back to whichever session held it before.
            if let Err(cleanup) = ctx
                .users
                .restore_connection(participant_id, connection.id(), previous)
                .await
            {
                warn!(target: "signaling.session", error = %cleanup, "Failed to restore connection after refusal");
            }
            Err(e)
        }
    }
}

/// Forward decoded frames to the loop until a terminal failure.
async fn read_frames<R>(mut reader: R, frames: mpsc::Sender<Result<SignalingFrame, SignalingError>>)
where
    R: Stream<Item = Result<SignalingFrame, SignalingError>> + Unpin,
{
    loop {
        let item = match reader.next().await {
            Some(Err(SignalingError::BadRequest(reason))) => {
                warn!(target: "signaling.session", reason = %reason, "Dropping undecodable client message");
                continue;
            }
            Some(item) => item,
            None => Err(SignalingError::Transport(
                "connection closed by client".to_string(),
            )),
        };

        let terminal = item.is_err();
        if frames.send(item).await.is_err() || terminal {
            break;
        }
    }
}

struct Session {
    ctx: SessionContext,
    participant_id: String,
    room_id: String,
    connection: ConnectionHandle,
    /// Connection of the other occupant, once known.
    peer: Option<ConnectionHandle>,
    /// Still seated; cleared once a leave has been issued.
    joined: bool,
}

impl Session {
    async fn relay_loop(
        &mut self,
        mut events: mpsc::Receiver<RoomEvent>,
        mut frames: mpsc::Receiver<Result<SignalingFrame, SignalingError>>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let period = self.ctx.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!(target: "signaling.session", "Session cancelled");
                    self.leave().await;
                    return SessionEnd::Cancelled;
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        debug!(target: "signaling.session", "Room event queue closed");
                        return SessionEnd::RoomClosed;
                    };
                    if let Some(end) = self.handle_event(event).await {
                        return end;
                    }
                }

                frame = frames.recv() => match frame {
                    Some(Ok(frame)) => self.relay(frame).await,
                    Some(Err(e)) => {
                        debug!(target: "signaling.session", error = %e, "Client read failed");
                        return SessionEnd::ReadFailed;
                    }
                    None => return SessionEnd::ReadFailed,
                },

                _ = heartbeat.tick() => {
                    if let Err(e) = self.ctx.users.update_active(&self.participant_id).await {
                        error!(target: "signaling.session", error = %e, "Heartbeat update failed");
                        return SessionEnd::HeartbeatFailed;
                    }
                }
            }
        }
    }

    /// Apply a room event. Returns `Some` when the session must end.
    async fn handle_event(&mut self, event: RoomEvent) -> Option<SessionEnd> {
        match event {
            RoomEvent::LeaveRoom(peer_id) => {
                debug!(target: "signaling.session", peer_id = %peer_id, "Peer left room");
                self.peer = None;
                None
            }
            RoomEvent::NewComer(peer_id) => match self.resolve_peer(&peer_id).await {
                Ok(peer) => {
                    debug!(target: "signaling.session", peer_id = %peer_id, connected = peer.is_some(), "Peer joined room");
                    self.peer = peer;
                    None
                }
                Err(e) => {
                    error!(target: "signaling.session", peer_id = %peer_id, error = %e, "Failed to resolve new peer");
                    Some(SessionEnd::PeerResolutionFailed)
                }
            },
            RoomEvent::RoomDeleted => {
                debug!(target: "signaling.session", "Room deleted");
                // The room is gone; there is nothing left to leave.
                self.joined = false;
                Some(SessionEnd::RoomDeleted)
            }
        }
    }

    async fn resolve_peer(&self, peer_id: &str) -> Result<Option<ConnectionHandle>, SignalingError> {
        let user = self
            .ctx
            .users
            .get_user(peer_id)
            .await
            .map_err(|e| SignalingError::IdentityResolution(format!("{peer_id}: {e}")))?;
        Ok(user.connection)
    }

    /// Forward a client frame to the peer if it is a relayed kind.
    async fn relay(&mut self, frame: SignalingFrame) {
        let kind = frame.kind();
        if !kind.is_relayed() {
            if kind == FrameKind::Hangup {
                debug!(target: "signaling.session", "Hangup received, no action");
            } else {
                debug!(target: "signaling.session", event = %frame.event, "Ignoring unknown frame kind");
            }
            metrics::record_frame(kind.as_str(), "ignored");
            return;
        }

        // Shape mismatches are only logged.
        if let Err(e) = frame.validate() {
            debug!(target: "signaling.session", error = %e, "Relaying frame with unexpected payload shape");
        }

        let Some(peer) = self.peer.as_ref() else {
            debug!(target: "signaling.session", event = kind.as_str(), "No peer yet, dropping frame");
            metrics::record_frame(kind.as_str(), "no_peer");
            return;
        };

        let sent = peer.send_frame(frame, self.ctx.peer_send_timeout).await;
        match sent {
            Ok(()) => metrics::record_frame(kind.as_str(), "relayed"),
            Err(SignalingError::PeerTimeout(reason)) => {
                warn!(target: "signaling.session", reason = %reason, "Peer is not draining, frame dropped");
                metrics::record_frame(kind.as_str(), "timeout");
            }
            Err(e) => {
                debug!(target: "signaling.session", error = %e, "Peer connection gone");
                self.peer = None;
                metrics::record_frame(kind.as_str(), "peer_gone");
            }
        }
    }

    async fn leave(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        match self
            .ctx
            .rooms
            .leave_room(&self.room_id, &self.participant_id)
            .await
        {
            Ok(()) | Err(SignalingError::NotInRoom { .. } | SignalingError::NotFound(_)) => {}
            Err(e) => {
                warn!(target: "signaling.session", error = %e, "Failed to leave room");
            }
        }
    }

    async fn teardown(&mut self, end: SessionEnd) {
        self.leave().await;
        self.peer = None;
        self.connection.close(end.close_code(), end.as_str());
        if let Err(e) = self
            .ctx
            .users
            .disconnect(&self.participant_id, self.connection.id())
            .await
        {
            warn!(target: "signaling.session", error = %e, "Failed to clear user connection");
        }
    }
}
