//! Test utilities for the signaling server.
//!
//! - [`TestSignalingServer`] spawns a real server on a random port
//! - [`WsClient`] is a minimal signaling client over tokio-tungstenite

pub mod server_harness;
pub mod ws_client;

pub use server_harness::TestSignalingServer;
pub use ws_client::WsClient;
