//! Core transport traits.
//!
//! These traits define the interface every transport implementation must
//! provide, keeping the session layer protocol-agnostic.

use async_trait::async_trait;
use thiserror::Error;
use wavelink_protocol::{ClientEvent, ServerEvent};

/// Where and how to reach the server.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// HTTP(S) base URL of the server, e.g. `http://localhost:4000`.
    pub base_url: String,
    /// Channel namespace below the base URL, always slash-prefixed.
    pub namespace: String,
    /// Credential attached at connect time, if any.
    pub credential: Option<String>,
}

impl Endpoint {
    /// Create an endpoint for a base URL and channel namespace.
    #[must_use]
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = if namespace.starts_with('/') {
            namespace
        } else {
            format!("/{namespace}")
        };
        Self {
            base_url: base_url.into(),
            namespace,
            credential: None,
        }
    }

    /// Attach a credential, sent as a `token` query parameter.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// WebSocket URL for the channel.
    #[must_use]
    pub fn socket_url(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        self.with_token(format!("{}{}", base.trim_end_matches('/'), self.namespace))
    }

    /// Long-poll URL for the channel.
    #[must_use]
    pub fn poll_url(&self) -> String {
        self.with_token(format!("{}{}/poll", self.http_base(), self.namespace))
    }

    /// Emit URL for the long-poll transport.
    #[must_use]
    pub fn emit_url(&self) -> String {
        self.with_token(format!("{}{}/emit", self.http_base(), self.namespace))
    }

    fn http_base(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            self.base_url.clone()
        };
        base.trim_end_matches('/').to_string()
    }

    fn with_token(&self, url: String) -> String {
        match &self.credential {
            Some(token) => format!("{url}?token={token}"),
            None => url,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection timed out.
    #[error("Connection timed out")]
    Timeout,

    /// The endpoint refused or failed the handshake.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Failed to send an event.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive an event.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Codec error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] wavelink_protocol::ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other transport error.
    #[error("{0}")]
    Other(String),
}

/// A transport that can dial the server.
///
/// Implementations own a concrete protocol (WebSocket, long-polling) and
/// hand out [`Connection`]s with uniform semantics.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish a connection to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint cannot be reached or refuses the
    /// handshake. Retry policy belongs to the caller.
    async fn dial(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError>;

    /// Transport name (e.g. "websocket", "polling").
    fn name(&self) -> &'static str;
}

/// An active channel connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Receive the next server event.
    ///
    /// Returns `Ok(None)` when the connection closed cleanly. Frames that do
    /// not decode to a known event are skipped with a log line, never
    /// surfaced as errors.
    async fn recv(&mut self) -> Result<Option<ServerEvent>, TransportError>;

    /// Send a client event.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection is closed or the write fails.
    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error when the close handshake fails.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Name of the transport this connection runs over.
    fn transport(&self) -> &'static str;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
