//! # wavelink-core
//!
//! Client-side realtime core for Wavelink: one channel session per process,
//! single-room chat membership, per-room append-only message logs, and a
//! read-state aware notification inbox.
//!
//! ## Components
//!
//! - **Session** - channel lifecycle: connect, reconnect, teardown
//! - **Membership** - the single joined room, replayed after reconnects
//! - **ChatStore** - per-room ordered message logs with one-shot history
//! - **Inbox** - deduplicated notifications with derived unread count
//! - **RealtimeClient** - owned assembly of the above behind an update feed
//!
//! ## Architecture
//!
//! ```text
//!                    status + events
//!   ┌─────────┐     ┌────────────┐      ┌───────────┐
//!   │ Session │────▶│ dispatcher │─────▶│ Feed<...> │──▶ consumers
//!   └─────────┘     └────────────┘      └───────────┘
//!        ▲               │  │
//!  join/leave/send       ▼  ▼
//!   ┌────────────┐  ┌───────────┐  ┌───────┐
//!   │ Membership │  │ ChatStore │  │ Inbox │
//!   └────────────┘  └───────────┘  └───────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wavelink_core::{ClientConfig, HttpHistory, RealtimeClient};
//! use wavelink_transport::FallbackTransport;
//!
//! let client = RealtimeClient::new(
//!     ClientConfig::default(),
//!     Arc::new(FallbackTransport::default()),
//!     Arc::new(HttpHistory::new("http://localhost:4000")),
//! );
//! client.connect(Some("token"));
//! client.join_match("m-42");
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod feed;
pub mod history;
pub mod inbox;
pub mod membership;
pub mod metrics;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{outgoing_message, ChatStore, LogState};
pub use client::{RealtimeClient, Update};
pub use config::{ClientConfig, ReconnectPolicy};
pub use feed::{Feed, SubscriberId, Subscription};
pub use history::{HistoryError, HistoryStore, HttpHistory};
pub use inbox::Inbox;
pub use membership::Membership;
pub use session::{ConnectionStatus, SessionHandle};

pub use wavelink_protocol::{ChatMessage, MatchId, Notification, NotificationStatus};
