//! Service layer: room lifecycle and user registry.
//!
//! Both services sit on top of a [`common::repository::Repository`] trait
//! object and serialize their read-modify-write cycles with an async mutex.

pub mod room_service;
pub mod user_service;

pub use room_service::{JoinedRoom, RoomService};
pub use user_service::UserService;
