//! Room lifecycle: creation, two-slot pairing, membership events and expiry.
//!
//! Every mutation of a room's slots or subscriber queues goes through
//! [`RoomService`]. Mutations are serialized by `mutation_lock` so a
//! find-modify-update cycle on the store is never interleaved with another.
//!
//! # Expiry
//!
//! A room whose `expires_at` has passed is hidden from listings but stays
//! joinable, and its sessions keep running, until `expires_at + grace`.
//! After that the room is reclaimed by the next list, join or leave that
//! touches it.
//!
//! # Event delivery
//!
//! Events are pushed with `try_send`. A subscriber whose queue is full loses
//! the event (logged and counted) instead of stalling the broadcaster.

use crate::errors::SignalingError;
use crate::models::{CreateRoomRequest, Room, RoomEvent, EVENT_QUEUE_CAPACITY};
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use common::repository::Repository;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of a successful join.
#[derive(Debug)]
pub struct JoinedRoom {
    /// Room as persisted after the join (without subscriber queues).
    pub room: Room,
    /// Occupant of the other slot at join time.
    pub peer_id: Option<String>,
    /// This participant's event queue.
    pub events: mpsc::Receiver<RoomEvent>,
}

/// Owner of room state.
pub struct RoomService {
    repo: Arc<dyn Repository<Room>>,
    grace_period: Duration,
    mutation_lock: Mutex<()>,
}

impl RoomService {
    pub fn new(repo: Arc<dyn Repository<Room>>, grace_period: Duration) -> Self {
        Self {
            repo,
            grace_period,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Create an empty room. The creator is not seated.
    #[instrument(skip_all, name = "signaling.room.create")]
    pub async fn create_room(&self, request: CreateRoomRequest) -> Result<Room, SignalingError> {
        if request
            .users
            .as_ref()
            .is_some_and(|users| users.iter().any(Option::is_some))
        {
            warn!(
                target: "signaling.room",
                created_by = %request.created_by,
                "Ignoring pre-seeded users on room creation; slots are filled by joining"
            );
        }

        let expires_at = request
            .expired_at
            .map(|ts| {
                DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                    SignalingError::BadRequest(format!("expired_at out of range: {ts}"))
                })
            })
            .transpose()?;

        let room = Room {
            id: Uuid::now_v7().to_string(),
            name: request.name,
            description: request.description,
            users: [None, None],
            created_at: Utc::now(),
            created_by: request.created_by,
            expires_at,
            subscribers: HashMap::new(),
        };

        self.repo.insert(room.clone()).await?;
        metrics::record_room_created();

        info!(
            target: "signaling.room",
            room_id = %room.id,
            created_by = %room.created_by,
            expires_at = ?room.expires_at,
            "Room created"
        );

        Ok(room)
    }

    pub async fn get_room(&self, room_id: &str) -> Result<Room, SignalingError> {
        Ok(self.repo.find(&room_id.to_string()).await?.detached())
    }

    /// Delete a room, telling every subscriber first.
    #[instrument(skip_all, name = "signaling.room.delete", fields(room_id = %room_id))]
    pub async fn delete_room(&self, room_id: &str) -> Result<(), SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        let room = self.repo.find(&room_id.to_string()).await?;
        self.cascade_delete(room, "explicit").await
    }

    /// Rooms that are not expired, oldest first.
    ///
    /// Rooms past their grace window are deleted as a side effect.
    #[instrument(skip_all, name = "signaling.room.list")]
    pub async fn list_rooms(&self) -> Result<Vec<Room>, SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        let now = Utc::now();

        let mut visible = Vec::new();
        let mut reclaimable = Vec::new();
        for room in self.repo.list_all().await? {
            if room.should_delete_at(now, self.grace_period) {
                reclaimable.push(room);
            } else if !room.is_expired_at(now) {
                visible.push(room.detached());
            }
        }

        for room in reclaimable {
            let room_id = room.id.clone();
            if let Err(e) = self.cascade_delete(room, "list_reclaim").await {
                warn!(target: "signaling.room", room_id = %room_id, error = %e, "Failed to reclaim expired room");
            }
        }

        visible.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(visible)
    }

    /// `list_rooms` restricted to one owner. An empty owner matches every room.
    pub async fn list_own_rooms(&self, owner_id: &str) -> Result<Vec<Room>, SignalingError> {
        let rooms = self.list_rooms().await?;
        if owner_id.is_empty() {
            return Ok(rooms);
        }
        Ok(rooms
            .into_iter()
            .filter(|room| room.created_by == owner_id)
            .collect())
    }

    /// Seat a participant in the first free slot.
    #[instrument(skip_all, name = "signaling.room.join", fields(room_id = %room_id, participant_id = %participant_id))]
    pub async fn join_room(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<JoinedRoom, SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        let mut room = self.repo.find(&room_id.to_string()).await?;

        if room.should_delete_at(Utc::now(), self.grace_period) {
            self.cascade_delete(room, "join_reclaim").await?;
            return Err(SignalingError::RoomExpired(room_id.to_string()));
        }
        if room.is_full() {
            return Err(SignalingError::RoomFull(room_id.to_string()));
        }
        if room.slot_of(participant_id).is_some() {
            return Err(SignalingError::AlreadyInRoom {
                room_id: room_id.to_string(),
                participant_id: participant_id.to_string(),
            });
        }

        let slot = room
            .users
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or_else(|| SignalingError::RoomFull(room_id.to_string()))?;
        *slot = Some(participant_id.to_string());

        broadcast(
            &room,
            participant_id,
            &RoomEvent::NewComer(participant_id.to_string()),
        );

        let (sender, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        room.subscribers.insert(participant_id.to_string(), sender);

        let peer_id = room.occupant_other_than(participant_id).map(str::to_string);
        self.repo.update(room.clone()).await?;

        info!(
            target: "signaling.room",
            room_id = %room_id,
            participant_id = %participant_id,
            peer_id = ?peer_id,
            "Participant joined room"
        );

        Ok(JoinedRoom {
            room: room.detached(),
            peer_id,
            events,
        })
    }

    /// Free a participant's slot and close their event queue.
    #[instrument(skip_all, name = "signaling.room.leave", fields(room_id = %room_id, participant_id = %participant_id))]
    pub async fn leave_room(&self, room_id: &str, participant_id: &str) -> Result<(), SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        let mut room = self.repo.find(&room_id.to_string()).await?;

        let slot = room
            .slot_of(participant_id)
            .and_then(|index| room.users.get_mut(index))
            .ok_or_else(|| SignalingError::NotInRoom {
                room_id: room_id.to_string(),
                participant_id: participant_id.to_string(),
            })?;
        *slot = None;
        room.subscribers.remove(participant_id);

        broadcast(
            &room,
            participant_id,
            &RoomEvent::LeaveRoom(participant_id.to_string()),
        );

        info!(
            target: "signaling.room",
            room_id = %room_id,
            participant_id = %participant_id,
            "Participant left room"
        );

        if room.should_delete_at(Utc::now(), self.grace_period) {
            return self.cascade_delete(room, "leave_reclaim").await;
        }
        self.repo.update(room).await?;
        Ok(())
    }

    /// Send `room_deleted` to open queues, close them, then remove the room.
    ///
    /// Callers hold `mutation_lock`.
    async fn cascade_delete(&self, mut room: Room, trigger: &'static str) -> Result<(), SignalingError> {
        for (participant_id, queue) in room.subscribers.drain() {
            if queue.is_closed() {
                debug!(target: "signaling.room", room_id = %room.id, participant_id = %participant_id, "Subscriber queue already closed");
                metrics::record_room_event(RoomEvent::RoomDeleted.as_str(), "closed");
                continue;
            }
            deliver(&room.id, &participant_id, &queue, RoomEvent::RoomDeleted);
        }

        self.repo.delete(&room.id).await?;
        metrics::record_room_deleted(trigger);

        info!(target: "signaling.room", room_id = %room.id, trigger, "Room deleted");
        Ok(())
    }
}

/// Deliver `event` to every subscriber except `except`.
fn broadcast(room: &Room, except: &str, event: &RoomEvent) {
    for (participant_id, queue) in room
        .subscribers
        .iter()
        .filter(|(participant_id, _)| participant_id.as_str() != except)
    {
        deliver(&room.id, participant_id, queue, event.clone());
    }
}

fn deliver(room_id: &str, participant_id: &str, queue: &mpsc::Sender<RoomEvent>, event: RoomEvent) {
    let name = event.as_str();
    match queue.try_send(event) {
        Ok(()) => metrics::record_room_event(name, "delivered"),
        Err(TrySendError::Full(_)) => {
            warn!(
                target: "signaling.room",
                room_id = %room_id,
                participant_id = %participant_id,
                event = name,
                "Subscriber queue full, dropping room event"
            );
            metrics::record_room_event(name, "dropped_full");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(
                target: "signaling.room",
                room_id = %room_id,
                participant_id = %participant_id,
                event = name,
                "Subscriber queue closed"
            );
            metrics::record_room_event(name, "closed");
        }
    }
}
