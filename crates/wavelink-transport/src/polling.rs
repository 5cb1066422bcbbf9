//! HTTP long-polling transport implementation.
//!
//! The degraded tier of the transport stack, for networks where WebSocket
//! upgrades fail. A poller task keeps one request in flight against the poll
//! endpoint and queues the decoded batches; `recv` drains that queue, so a
//! caller dropping an in-flight `recv` never loses events. Outbound events
//! are posted one at a time to the emit endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wavelink_protocol::{codec, ClientEvent, ServerEvent};

use crate::traits::{Connection, Endpoint, Transport, TransportError};

/// Long-polling transport configuration.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// How long the server may hold an empty poll open.
    pub wait: Duration,
    /// Timeout for the initial reachability probe.
    pub probe_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(25),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP long-polling transport.
pub struct PollingTransport {
    config: PollingConfig,
    http: reqwest::Client,
}

impl PollingTransport {
    /// Create a new long-polling transport.
    #[must_use]
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl Default for PollingTransport {
    fn default() -> Self {
        Self::new(PollingConfig::default())
    }
}

#[async_trait]
impl Transport for PollingTransport {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError> {
        // The dial succeeds only after a zero-wait probe of the poll endpoint.
        let poll_url = endpoint.poll_url();
        debug!(url = %poll_url, "Probing poll endpoint");

        let response = self
            .http
            .get(&poll_url)
            .query(&[("wait", "0")])
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Handshake(format!(
                "poll endpoint returned {}",
                response.status()
            )));
        }

        let initial = match response.json::<Vec<serde_json::Value>>().await {
            Ok(batch) => decode_batch(batch),
            Err(_) => Vec::new(),
        };

        debug!(url = %poll_url, buffered = initial.len(), "Poll endpoint reachable");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        for event in initial {
            let _ = events_tx.send(Ok(event));
        }
        let poller = tokio::spawn(poll_events(
            self.http.clone(),
            poll_url,
            self.config.wait.as_secs(),
            events_tx,
        ));

        Ok(Box::new(PollingConnection {
            http: self.http.clone(),
            emit_url: endpoint.emit_url(),
            events: events_rx,
            poller,
            open: true,
        }))
    }

    fn name(&self) -> &'static str {
        "polling"
    }
}

/// Poll in a loop, pushing each decoded event into the connection's queue.
///
/// Exits when the poll session ends (410), a request fails, or the
/// connection is gone.
async fn poll_events(
    http: reqwest::Client,
    poll_url: String,
    wait_secs: u64,
    events: mpsc::UnboundedSender<Result<ServerEvent, TransportError>>,
) {
    loop {
        let result = http
            .get(&poll_url)
            .query(&[("wait", wait_secs.to_string())])
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let _ = events.send(Err(TransportError::ReceiveFailed(e.to_string())));
                return;
            }
        };

        if response.status() == reqwest::StatusCode::GONE {
            debug!("Poll session expired");
            return;
        }
        if !response.status().is_success() {
            let _ = events.send(Err(TransportError::ReceiveFailed(format!(
                "poll returned {}",
                response.status()
            ))));
            return;
        }

        match response.json::<Vec<serde_json::Value>>().await {
            Ok(batch) => {
                for event in decode_batch(batch) {
                    if events.send(Ok(event)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!(error = %e, "Undecodable poll batch skipped"),
        }
    }
}

/// A live long-polling connection.
pub struct PollingConnection {
    http: reqwest::Client,
    emit_url: String,
    events: mpsc::UnboundedReceiver<Result<ServerEvent, TransportError>>,
    poller: JoinHandle<()>,
    open: bool,
}

#[async_trait]
impl Connection for PollingConnection {
    async fn recv(&mut self) -> Result<Option<ServerEvent>, TransportError> {
        if !self.open {
            return Ok(None);
        }
        match self.events.recv().await {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(e)) => {
                self.open = false;
                Err(e)
            }
            None => {
                self.open = false;
                Ok(None)
            }
        }
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::ConnectionClosed);
        }

        let frame = codec::encode(&event)?;
        let response = self
            .http
            .post(&self.emit_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(frame)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::SendFailed(format!(
                "emit returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        self.poller.abort();
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "polling"
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for PollingConnection {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

/// Decode a poll batch, skipping items that are not known events.
fn decode_batch(batch: Vec<serde_json::Value>) -> Vec<ServerEvent> {
    batch
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ServerEvent>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Undecodable poll item skipped");
                None
            }
        })
        .collect()
}
