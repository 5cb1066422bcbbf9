//! Fallback transport negotiation.
//!
//! Dials transports in priority order so a session comes up on the best
//! channel the network allows. The preferred transport is tried again on
//! every dial, which upgrades a downgraded session at the next reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::traits::{Connection, Endpoint, Transport, TransportError};

/// A transport that tries multiple transports in order of preference.
pub struct FallbackTransport {
    transports: Vec<Arc<dyn Transport>>,
}

impl FallbackTransport {
    /// Create a new fallback transport with the given transports.
    ///
    /// Transports are tried in order (first = highest priority).
    #[must_use]
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// Add a transport to the end of the chain.
    pub fn add_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transports.push(transport);
    }

    /// Transport names in priority order.
    #[must_use]
    pub fn transport_names(&self) -> Vec<&'static str> {
        self.transports.iter().map(|t| t.name()).collect()
    }
}

#[cfg(all(feature = "websocket", feature = "polling"))]
impl Default for FallbackTransport {
    /// WebSocket preferred, long-polling as the degraded tier.
    fn default() -> Self {
        Self::new(vec![
            Arc::new(crate::websocket::WebSocketTransport::default()),
            Arc::new(crate::polling::PollingTransport::default()),
        ])
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError> {
        let mut last_error = TransportError::Other("no transports configured".to_string());

        for transport in &self.transports {
            debug!(transport = transport.name(), "Trying transport");
            match transport.dial(endpoint).await {
                Ok(conn) => {
                    info!(transport = transport.name(), "Transport negotiated");
                    return Ok(conn);
                }
                Err(e) => {
                    warn!(transport = transport.name(), error = %e, "Transport dial failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
