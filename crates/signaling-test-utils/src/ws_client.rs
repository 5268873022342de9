//! Minimal WebSocket signaling client for integration tests.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Default wait for an inbound message.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// What the server sent next.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Frame(Value),
    Closed { code: Option<u16>, reason: String },
}

/// Signaling client connected to `/ws/:room_id`.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect as `user_id` (sent in `X-User-ID`).
    pub async fn connect(url: &str, user_id: &str) -> Result<Self, anyhow::Error> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert("x-user-id", HeaderValue::from_str(user_id)?);
        let (stream, _response) = connect_async(request).await?;
        Ok(Self { stream })
    }

    /// Send `{ event, data }`.
    pub async fn send_frame(&mut self, event: &str, data: Value) -> Result<(), anyhow::Error> {
        let text = serde_json::json!({ "event": event, "data": data }).to_string();
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Send a raw text message.
    pub async fn send_text(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Next signaling frame or close, skipping control frames.
    pub async fn recv(&mut self) -> Result<Received, anyhow::Error> {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow::anyhow!("timed out waiting for message"))?;
            match message {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Received::Frame(serde_json::from_str(&text)?));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Received::Closed {
                        code: frame.as_ref().map(|f| u16::from(f.code)),
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    });
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Ok(Received::Closed {
                        code: None,
                        reason: String::new(),
                    })
                }
            }
        }
    }

    /// Nothing arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.stream.next()).await.is_err()
    }

    /// Close the connection normally.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.stream
            .close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await?;
        Ok(())
    }
}
