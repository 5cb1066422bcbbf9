//! # wavelink-protocol
//!
//! Wire contract for the Wavelink realtime client.
//!
//! Defines the events exchanged over the chat channel, the shared records
//! they carry, and the JSON text codec used by every transport.
//!
//! ## Events
//!
//! Outbound (client to server):
//!
//! - `join_match` / `leave_match` - room membership
//! - `send_message` - publish chat text to a room
//!
//! Inbound (server to client):
//!
//! - `new_message` - chat broadcast for the joined room
//! - `notification` - inbox push
//! - `match_updated` / `application_updated` - opaque state changes
//! - `error` - server-side failure report
//!
//! ## Example
//!
//! ```rust
//! use wavelink_protocol::{codec, ClientEvent};
//!
//! let frame = codec::encode(&ClientEvent::join("m-42")).unwrap();
//! assert!(frame.contains("join_match"));
//! ```

pub mod codec;
pub mod events;
pub mod records;

pub use codec::{decode, encode, ProtocolError, MAX_FRAME_SIZE};
pub use events::{ClientEvent, ServerEvent};
pub use records::{ChatMessage, MatchId, Notification, NotificationStatus};
