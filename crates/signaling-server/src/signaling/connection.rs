//! Outbound half of a signaling connection.
//!
//! A [`ConnectionHandle`] is the registry's reference to a live WebSocket.
//! Writes go through a bounded queue drained by [`run_writer`], so the socket
//! sink has exactly one owner and callers can bound how long they wait.

use crate::errors::SignalingError;
use crate::signaling::frame::SignalingFrame;
use axum::extract::ws::{CloseFrame, Message};
use futures::{Sink, SinkExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Capacity of the per-connection outbound queue.
const OUTBOUND_CHANNEL_BUFFER: usize = 32;

/// Close frame reasons are limited to 123 bytes on the wire.
const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Item queued for the socket writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(SignalingFrame),
    Close { code: u16, reason: String },
}

/// Cloneable handle to a connection's outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    sender: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its writer drains.
    pub fn new() -> (Self, mpsc::Receiver<Outbound>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_CHANNEL_BUFFER);
        (
            Self {
                id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    /// Unique id of this connection (not the participant).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a frame, waiting at most `timeout` for space.
    pub async fn send_frame(
        &self,
        frame: SignalingFrame,
        timeout: Duration,
    ) -> Result<(), SignalingError> {
        self.sender
            .send_timeout(Outbound::Frame(frame), timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SignalingError::PeerTimeout(format!(
                    "connection {} did not accept frame within {:?}",
                    self.id, timeout
                )),
                SendTimeoutError::Closed(_) => {
                    SignalingError::Transport(format!("connection {} is closed", self.id))
                }
            })
    }

    /// Ask the writer to send a close frame and stop. Never blocks.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        match self.sender.try_send(Outbound::Close {
            code,
            reason: truncate_reason(reason.into()),
        }) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                debug!(target: "signaling.connection", connection_id = %self.id, "Close on already closed connection");
            }
            Err(TrySendError::Full(_)) => {
                warn!(target: "signaling.connection", connection_id = %self.id, "Outbound queue full, close frame dropped");
            }
        }
    }

    /// The writer has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

fn truncate_reason(mut reason: String) -> String {
    if reason.len() > MAX_CLOSE_REASON_BYTES {
        let mut end = MAX_CLOSE_REASON_BYTES;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

/// Drain `outbound` into `sink` until a close is requested or every handle is dropped.
pub async fn run_writer<S>(mut sink: S, mut outbound: mpsc::Receiver<Outbound>)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(target: "signaling.connection", error = %e, "Failed to encode frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!(target: "signaling.connection", error = %e, "Socket write failed");
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let close = Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                }));
                if let Err(e) = sink.send(close).await {
                    debug!(target: "signaling.connection", error = %e, "Close frame write failed");
                }
                break;
            }
        }
    }

    outbound.close();
    if let Err(e) = sink.close().await {
        debug!(target: "signaling.connection", error = %e, "Socket close failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;
    use serde_json::json;

    fn offer() -> SignalingFrame {
        SignalingFrame::new("offer", json!({"type": "offer", "sdp": "v=0"}))
    }

    #[tokio::test]
    async fn test_send_frame_is_queued() {
        let (handle, mut rx) = ConnectionHandle::new();
        handle
            .send_frame(offer(), Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Outbound::Frame(offer())));
    }

    #[tokio::test]
    async fn test_send_frame_to_closed_connection_is_transport_error() {
        let (handle, rx) = ConnectionHandle::new();
        drop(rx);

        assert!(handle.is_closed());
        let err = handle
            .send_frame(offer(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SignalingError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_frame_times_out_when_queue_is_full() {
        let (handle, _rx) = ConnectionHandle::new();
        for _ in 0..OUTBOUND_CHANNEL_BUFFER {
            handle
                .send_frame(offer(), Duration::from_millis(50))
                .await
                .unwrap();
        }

        let err = handle
            .send_frame(offer(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SignalingError::PeerTimeout(_)));
    }

    #[tokio::test]
    async fn test_writer_encodes_frames_and_stops_on_close() {
        let (handle, rx) = ConnectionHandle::new();
        let (sink, mut written) = fmpsc::unbounded::<Message>();

        handle
            .send_frame(offer(), Duration::from_millis(50))
            .await
            .unwrap();
        handle.close(4404, "gone");

        run_writer(sink, rx).await;

        match written.next().await.unwrap() {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["event"], "offer");
                assert_eq!(value["data"]["sdp"], "v=0");
            }
            other => panic!("expected text frame, got {other:?}"),
        }
        match written.next().await.unwrap() {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, 4404);
                assert_eq!(frame.reason, "gone");
            }
            other => panic!("expected close frame, got {other:?}"),
        }

        assert!(handle.is_closed());
    }

    #[test]
    fn test_close_reason_is_truncated_on_char_boundary() {
        let reason = "é".repeat(100);
        let truncated = truncate_reason(reason);
        assert!(truncated.len() <= MAX_CLOSE_REASON_BYTES);
        assert_eq!(truncated.len(), 122);

        assert_eq!(truncate_reason("short".to_string()), "short");
    }

    #[tokio::test]
    async fn test_writer_exits_when_all_handles_dropped() {
        let (handle, rx) = ConnectionHandle::new();
        let (sink, mut written) = fmpsc::unbounded::<Message>();
        drop(handle);

        run_writer(sink, rx).await;
        assert!(written.next().await.is_none());
    }
}
