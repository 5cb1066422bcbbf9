//! Shared wire records.
//!
//! These types appear both in channel event payloads and in history API
//! responses, so they live at the protocol layer. Field names follow the
//! server's camelCase convention on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a match, which doubles as the chat room id.
pub type MatchId = String;

/// A chat message in a room log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned id, or a locally generated one for streamed messages.
    #[serde(default)]
    pub id: String,

    /// Room the message belongs to.
    #[serde(default)]
    pub room_id: MatchId,

    /// Author of the message.
    #[serde(default)]
    pub sender_id: String,

    /// Message body.
    #[serde(default)]
    pub text: String,

    /// Creation time as reported by the server.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message for a room.
    #[must_use]
    pub fn new(room_id: impl Into<MatchId>, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            room_id: room_id.into(),
            sender_id: String::new(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Set the message id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the sender.
    #[must_use]
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    /// Set the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Read state of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Delivered but not yet acknowledged by the user.
    #[default]
    Pending,
    /// Acknowledged via mark-read.
    Sent,
}

impl NotificationStatus {
    /// True when the notification counts toward the unread badge.
    #[must_use]
    pub fn is_unread(self) -> bool {
        matches!(self, NotificationStatus::Pending)
    }
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique id; inbox deduplication keys on it.
    #[serde(default)]
    pub id: String,

    /// Notification category, e.g. "message" or "application".
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Human-readable body.
    #[serde(default)]
    pub content: String,

    /// Read state.
    #[serde(default)]
    pub status: NotificationStatus,

    /// Creation time as reported by the server.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a new pending notification.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: String::new(),
            content: content.into(),
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the read state.
    #[must_use]
    pub fn with_status(mut self, status: NotificationStatus) -> Self {
        self.status = status;
        self
    }
}
