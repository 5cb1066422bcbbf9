//! Channel event types.
//!
//! Events travel as JSON text frames shaped `{"event": <name>, "data": <payload>}`.
//! Client events name the room explicitly; inbound chat events are
//! room-implicit and scoped by the server to the connection's membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{MatchId, Notification};

/// Events the client emits over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Enter a room's broadcast scope.
    JoinMatch { room_id: MatchId },
    /// Exit a room's broadcast scope.
    LeaveMatch { room_id: MatchId },
    /// Publish a chat message to a room.
    SendMessage { room_id: MatchId, text: String },
}

impl ClientEvent {
    /// Create a `join_match` event.
    #[must_use]
    pub fn join(room_id: impl Into<MatchId>) -> Self {
        ClientEvent::JoinMatch {
            room_id: room_id.into(),
        }
    }

    /// Create a `leave_match` event.
    #[must_use]
    pub fn leave(room_id: impl Into<MatchId>) -> Self {
        ClientEvent::LeaveMatch {
            room_id: room_id.into(),
        }
    }

    /// Create a `send_message` event.
    #[must_use]
    pub fn send(room_id: impl Into<MatchId>, text: impl Into<String>) -> Self {
        ClientEvent::SendMessage {
            room_id: room_id.into(),
            text: text.into(),
        }
    }

    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinMatch { .. } => "join_match",
            ClientEvent::LeaveMatch { .. } => "leave_match",
            ClientEvent::SendMessage { .. } => "send_message",
        }
    }
}

/// Events the server pushes to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// A chat message broadcast to the connection's joined room.
    NewMessage {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// Opaque match state change, forwarded to consumers untouched.
    MatchUpdated(serde_json::Value),
    /// Opaque application state change, forwarded to consumers untouched.
    ApplicationUpdated(serde_json::Value),
    /// A new notification for the authenticated user.
    Notification(Notification),
    /// Server-reported error, informational only.
    Error {
        #[serde(default)]
        message: String,
    },
}

impl ServerEvent {
    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage { .. } => "new_message",
            ServerEvent::MatchUpdated(_) => "match_updated",
            ServerEvent::ApplicationUpdated(_) => "application_updated",
            ServerEvent::Notification(_) => "notification",
            ServerEvent::Error { .. } => "error",
        }
    }
}
