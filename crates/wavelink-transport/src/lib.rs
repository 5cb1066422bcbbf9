//! # wavelink-transport
//!
//! Transport layer for the Wavelink realtime client.
//!
//! This crate provides a unified interface over the protocols the channel
//! can run on:
//!
//! - **WebSocket** - the preferred transport, works everywhere
//! - **Long-polling** - degraded tier for restrictive networks
//!
//! ## Transport Abstraction
//!
//! All transports implement the `Transport` and `Connection` traits,
//! keeping the session layer protocol-agnostic.
//!
//! ```rust,ignore
//! use wavelink_transport::{Connection, Endpoint, FallbackTransport, Transport};
//!
//! async fn open(endpoint: &Endpoint) -> Box<dyn Connection> {
//!     FallbackTransport::default().dial(endpoint).await.unwrap()
//! }
//! ```

pub mod fallback;
pub mod traits;

#[cfg(feature = "polling")]
pub mod polling;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use fallback::FallbackTransport;
pub use traits::{Connection, Endpoint, Transport, TransportError};

#[cfg(feature = "polling")]
pub use polling::PollingTransport;

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
