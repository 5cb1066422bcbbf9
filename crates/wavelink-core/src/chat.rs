//! Per-room message log reconciliation.
//!
//! Each room's log moves `Uninitialized -> Loading -> Ready` once per
//! activation, with history fetched exactly once. Appends mirror transport
//! arrival order, and the log is append-only from the consumer's side. A
//! locally sent message is never appended here; it becomes visible when the
//! server broadcast arrives, which keeps a single append path.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};
use wavelink_protocol::{codec, ChatMessage, ClientEvent, MatchId};

use crate::history::HistoryStore;
use crate::metrics;

/// Load state of a room's message log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogState {
    /// No history fetch has happened for this activation.
    #[default]
    Uninitialized,
    /// A history fetch is in flight.
    Loading,
    /// History applied, or failed over to the last-known-good log.
    Ready,
}

#[derive(Debug, Default)]
struct MessageLog {
    state: LogState,
    messages: Vec<ChatMessage>,
}

/// Reconciles streamed chat events into per-room ordered logs.
pub struct ChatStore {
    rooms: DashMap<MatchId, MessageLog>,
    history: Arc<dyn HistoryStore>,
}

impl ChatStore {
    /// Create a store backed by the given history API.
    #[must_use]
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            rooms: DashMap::new(),
            history,
        }
    }

    /// Load a room's history, once per activation.
    ///
    /// Calls made while the log is `Loading` or `Ready` return the current
    /// snapshot without issuing a request. Messages appended while the fetch
    /// is in flight stay in the log, behind the fetched history. A failed
    /// fetch logs the error and leaves the room `Ready` with its previous
    /// log, so consumers are never stuck behind `Loading`.
    pub async fn load_history(&self, room_id: &str) -> Vec<ChatMessage> {
        {
            let mut log = self.rooms.entry(room_id.to_string()).or_default();
            match log.state {
                LogState::Loading | LogState::Ready => return log.messages.clone(),
                LogState::Uninitialized => log.state = LogState::Loading,
            }
        }

        match self.history.match_messages(room_id).await {
            Ok(messages) => {
                debug!(room = %room_id, count = messages.len(), "History loaded");
                let mut log = self.rooms.entry(room_id.to_string()).or_default();
                let mut merged = messages;
                // Re-append whatever arrived during the fetch, minus any
                // entry the fetch already covers.
                for message in log.messages.drain(..) {
                    if !merged.iter().any(|m| m.id == message.id) {
                        merged.push(message);
                    }
                }
                log.messages = merged;
                log.state = LogState::Ready;
                log.messages.clone()
            }
            Err(e) => {
                warn!(room = %room_id, error = %e, "History fetch failed");
                metrics::record_history_failure("messages");
                let mut log = self.rooms.entry(room_id.to_string()).or_default();
                log.state = LogState::Ready;
                log.messages.clone()
            }
        }
    }

    /// Append a broadcast message in arrival order.
    pub fn append(&self, room_id: &str, message: ChatMessage) {
        let mut log = self.rooms.entry(room_id.to_string()).or_default();
        log.messages.push(message);
        metrics::record_message("inbound");
    }

    /// Snapshot of a room's log.
    #[must_use]
    pub fn messages(&self, room_id: &str) -> Vec<ChatMessage> {
        self.rooms
            .get(room_id)
            .map(|log| log.messages.clone())
            .unwrap_or_default()
    }

    /// Load state of a room.
    #[must_use]
    pub fn state(&self, room_id: &str) -> LogState {
        self.rooms
            .get(room_id)
            .map(|log| log.state)
            .unwrap_or_default()
    }

    /// Drop a room's log when its activation ends.
    ///
    /// The next activation starts from `Uninitialized` and refetches.
    pub fn deactivate(&self, room_id: &str) {
        if self.rooms.remove(room_id).is_some() {
            debug!(room = %room_id, "Room log deactivated");
        }
    }
}

/// Compose a `send_message` event for a room.
///
/// Blank and whitespace-only text is rejected silently, as is text that
/// does not fit in a frame. The message is not appended locally; it becomes
/// visible through the server broadcast.
#[must_use]
pub fn outgoing_message(room_id: &str, text: &str) -> Option<ClientEvent> {
    if text.trim().is_empty() {
        debug!(room = %room_id, "Blank message dropped");
        return None;
    }
    let event = ClientEvent::send(room_id, text);
    if let Err(e) = codec::encode(&event) {
        warn!(room = %room_id, error = %e, "Unencodable message dropped");
        return None;
    }
    Some(event)
}
