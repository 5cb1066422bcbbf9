//! Room membership tracking.
//!
//! One room may be joined at a time. Transitions return the wire events to
//! emit; the controller itself never touches the channel, so it can be
//! driven identically from user calls and from the reconnect path.

use std::sync::Mutex;

use tracing::debug;
use wavelink_protocol::{ClientEvent, MatchId};

/// Tracks the single currently joined chat room.
#[derive(Debug, Default)]
pub struct Membership {
    current: Mutex<Option<MatchId>>,
}

impl Membership {
    /// Create a controller with no joined room.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently joined room, if any.
    #[must_use]
    pub fn current(&self) -> Option<MatchId> {
        self.current.lock().unwrap().clone()
    }

    /// Join a room, leaving the previous one first.
    ///
    /// Returns the events to emit in order. Empty when `room_id` is already
    /// the joined room.
    pub fn join(&self, room_id: &str) -> Vec<ClientEvent> {
        let mut current = self.current.lock().unwrap();
        if current.as_deref() == Some(room_id) {
            debug!(room = %room_id, "Join ignored: already joined");
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if let Some(previous) = current.take() {
            debug!(room = %previous, "Leaving superseded room");
            events.push(ClientEvent::leave(previous));
        }
        debug!(room = %room_id, "Joining room");
        events.push(ClientEvent::join(room_id));
        *current = Some(room_id.to_string());
        events
    }

    /// Leave a room.
    ///
    /// Returns the leave event only when `room_id` is the joined room;
    /// leaving any other room is ignored.
    pub fn leave(&self, room_id: &str) -> Option<ClientEvent> {
        let mut current = self.current.lock().unwrap();
        if current.as_deref() != Some(room_id) {
            debug!(room = %room_id, "Leave ignored: not the joined room");
            return None;
        }

        *current = None;
        debug!(room = %room_id, "Left room");
        Some(ClientEvent::leave(room_id))
    }

    /// Re-issue the join for the remembered room.
    ///
    /// Server-side membership is scoped to a connection, so the join must be
    /// replayed after every reconnect.
    pub fn rejoin(&self) -> Option<ClientEvent> {
        let current = self.current.lock().unwrap();
        current.as_ref().map(|room| {
            debug!(room = %room, "Re-joining after reconnect");
            ClientEvent::join(room.clone())
        })
    }
}
