//! WebSocket signaling: wire frames, per-connection outbound handles, and the
//! session loop that relays frames between the two occupants of a room.

pub mod connection;
pub mod frame;
pub mod session;

pub use connection::{ConnectionHandle, Outbound};
pub use frame::{FrameKind, SignalingFrame};
pub use session::{run_session, SessionContext, SessionEnd};
