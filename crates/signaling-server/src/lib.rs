//! Signaling Server Library
//!
//! Pairs two participants into a call room and relays WebRTC signaling
//! (offer/answer/ICE candidate) between them over WebSocket.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> common::repository
//!                        |
//!                        +-> signaling/session.rs (one per WebSocket)
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status and close code mapping
//! - `handlers` - HTTP and WebSocket upgrade handlers
//! - `models` - Rooms, users, events and DTOs
//! - `observability` - Health probes and metrics
//! - `routes` - Axum router and application state
//! - `services` - Room lifecycle manager and user registry
//! - `signaling` - Wire frames, connection handles and the session loop

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod signaling;
