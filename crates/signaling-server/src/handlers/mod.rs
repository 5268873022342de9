//! HTTP request handlers.

pub mod metrics;
pub mod rooms;
pub mod signaling;
pub mod users;

pub use metrics::metrics_handler;
pub use rooms::{create_room, delete_room, get_room, list_rooms};
pub use signaling::{resolve_identity, ws_handler, IDENTITY_HEADER};
pub use users::{create_user, delete_user, get_user, list_users};
