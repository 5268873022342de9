//! Data models for the signaling server.
//!
//! `Room` and `User` are the records held by the repositories. Request and
//! response DTOs for the HTTP surface live alongside them.

use crate::signaling::connection::ConnectionHandle;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::repository::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Number of participant slots in a room.
pub const ROOM_SLOTS: usize = 2;

/// Capacity of each participant's room event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 5;

/// A user is reported online only if active within this window.
pub const ONLINE_WINDOW_SECONDS: i64 = 300;

// ============================================================================
// Room
// ============================================================================

/// A two-party call room.
///
/// `users` holds the two slots; `subscribers` holds one event queue per
/// occupied slot and is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    pub users: [Option<String>; ROOM_SLOTS],
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(
        rename = "expired_at",
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) subscribers: HashMap<String, mpsc::Sender<RoomEvent>>,
}

impl Entity for Room {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Room {
    /// Both slots are occupied.
    pub fn is_full(&self) -> bool {
        self.users.iter().all(Option::is_some)
    }

    /// Index of the slot held by `participant_id`, if any.
    pub fn slot_of(&self, participant_id: &str) -> Option<usize> {
        self.users
            .iter()
            .position(|slot| slot.as_deref() == Some(participant_id))
    }

    /// The occupant other than `participant_id`.
    pub fn occupant_other_than(&self, participant_id: &str) -> Option<&str> {
        self.users
            .iter()
            .flatten()
            .map(String::as_str)
            .find(|occupant| *occupant != participant_id)
    }

    /// Number of occupied slots.
    pub fn occupied_slots(&self) -> usize {
        self.users.iter().flatten().count()
    }

    /// Past `expires_at`: hidden from listings.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Past `expires_at + grace`: must be reclaimed.
    pub fn should_delete_at(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        let grace = ChronoDuration::from_std(grace).unwrap_or(ChronoDuration::MAX);
        self.expires_at
            .and_then(|expires_at| expires_at.checked_add_signed(grace))
            .is_some_and(|deadline| deadline < now)
    }

    /// Copy of the room without its subscriber queues, safe to hand out.
    pub fn detached(&self) -> Room {
        Room {
            subscribers: HashMap::new(),
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// ============================================================================
// Room events
// ============================================================================

/// Membership event delivered to a room's subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A participant took a slot.
    NewComer(String),
    /// A participant gave up their slot.
    LeaveRoom(String),
    /// The room was deleted; always the last event on a queue.
    RoomDeleted,
}

impl RoomEvent {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomEvent::NewComer(_) => "new_comer",
            RoomEvent::LeaveRoom(_) => "leave_room",
            RoomEvent::RoomDeleted => "room_deleted",
        }
    }

    /// Participant the event is about, if any.
    pub fn participant(&self) -> Option<&str> {
        match self {
            RoomEvent::NewComer(id) | RoomEvent::LeaveRoom(id) => Some(id),
            RoomEvent::RoomDeleted => None,
        }
    }
}

// ============================================================================
// User
// ============================================================================

/// A participant known to the registry.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    /// Live connection while a signaling session is active.
    pub connection: Option<ConnectionHandle>,
    pub last_active: DateTime<Utc>,
}

impl Entity for User {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl User {
    pub fn new(id: impl Into<String>, connection: Option<ConnectionHandle>) -> Self {
        Self {
            id: id.into(),
            connection,
            last_active: Utc::now(),
        }
    }

    /// Connected and active within the last five minutes.
    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        self.connection.as_ref().is_some_and(|c| !c.is_closed())
            && now.signed_duration_since(self.last_active).num_seconds() < ONLINE_WINDOW_SECONDS
    }
}

// ============================================================================
// HTTP DTOs
// ============================================================================

/// Request body for `POST /rooms`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Accepted for compatibility; slots are only filled by joining.
    #[serde(default)]
    pub users: Option<[Option<String>; ROOM_SLOTS]>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, alias = "expires_at")]
    pub expired_at: Option<i64>,
}

/// Query string for `GET /rooms`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRoomsQuery {
    #[serde(default)]
    pub owner_id: String,
}

/// Request body for `POST /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub id: String,
}

/// User as returned by the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub last_active: DateTime<Utc>,
    pub online: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            last_active: user.last_active,
            online: user.is_online_at(Utc::now()),
        }
    }
}

/// Liveness response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
