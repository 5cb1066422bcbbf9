//! WebSocket transport implementation.
//!
//! The preferred transport: dials the channel endpoint with
//! tokio-tungstenite and exchanges events as JSON text frames.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};
use wavelink_protocol::{codec, ClientEvent, ServerEvent};

use crate::traits::{Connection, Endpoint, Transport, TransportError};

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum inbound frame size in bytes.
    pub max_frame_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_frame_size: codec::MAX_FRAME_SIZE,
        }
    }
}

/// WebSocket transport.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError> {
        let url = endpoint.socket_url();
        debug!(url = %url, "Dialing WebSocket endpoint");

        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        debug!(url = %url, "WebSocket handshake completed");

        Ok(Box::new(WebSocketConnection {
            stream,
            max_frame_size: self.config.max_frame_size,
            open: true,
        }))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A live WebSocket connection.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    max_frame_size: usize,
    open: bool,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Result<Option<ServerEvent>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > self.max_frame_size {
                        warn!(bytes = text.len(), "Oversized frame dropped");
                        continue;
                    }
                    match codec::decode(&text) {
                        Ok(event) => return Ok(Some(event)),
                        Err(e) => warn!(error = %e, "Undecodable frame skipped"),
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    // The channel contract is text frames only.
                    warn!("Unexpected binary frame skipped");
                }
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = self.stream.send(Message::Pong(payload)).await {
                        warn!(error = %e, "Failed to answer ping");
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    debug!("Close frame received");
                    self.open = false;
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    self.open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    self.open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::ConnectionClosed);
        }
        let frame = codec::encode(&event)?;
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Other(format!("Failed to close: {e}"))),
        }
    }

    fn transport(&self) -> &'static str {
        "websocket"
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
