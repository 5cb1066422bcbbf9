//! Channel session lifecycle.
//!
//! One session owns the transport connection for the whole process. A
//! background driver task dials, pumps events, and reconnects with a fixed
//! delay until the retry budget runs out. Callers observe status through a
//! cached snapshot and the status feed; nothing here blocks the caller.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wavelink_protocol::{ClientEvent, ServerEvent};
use wavelink_transport::{Connection, Endpoint, Transport, TransportError};

use crate::config::{ClientConfig, ReconnectPolicy};
use crate::feed::{Feed, Subscription};
use crate::metrics;

/// Connection status of the channel session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No live transport; also the terminal state once retries run out.
    #[default]
    Disconnected,
    /// A dial or reconnect cycle is in progress.
    Connecting,
    /// The channel is live.
    Connected,
}

impl ConnectionStatus {
    /// True when the channel is live.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Signals forwarded to the dispatcher, in arrival order.
#[derive(Debug, Clone)]
pub(crate) enum SessionSignal {
    /// The session status changed.
    Status(ConnectionStatus),
    /// The server pushed an event.
    Event(ServerEvent),
}

/// Sender half of the session's outbound queue.
///
/// Cheap to clone. Events queued after the driver exits are dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl SessionHandle {
    /// Queue an event for the channel. Fire-and-forget.
    pub fn emit(&self, event: ClientEvent) {
        if self.outbound.send(event).is_err() {
            debug!("Event dropped: session driver gone");
        }
    }
}

struct Live {
    handle: SessionHandle,
    driver: JoinHandle<()>,
}

struct Shared {
    status_tx: watch::Sender<ConnectionStatus>,
    status_feed: Feed<ConnectionStatus>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    epoch: Mutex<u64>,
}

impl Shared {
    /// Retire the current driver epoch and return the next one.
    ///
    /// An aborted driver keeps running until its next await point; any
    /// status it writes from there carries a retired epoch and is dropped.
    fn advance_epoch(&self) -> u64 {
        let mut epoch = self.epoch.lock().unwrap();
        *epoch += 1;
        *epoch
    }

    /// Publish a status change to the cache, the feed, and the dispatcher.
    /// Repeated sets of the same status publish nothing; neither do writes
    /// from a retired driver epoch.
    fn set_status(&self, epoch: u64, status: ConnectionStatus) {
        let current_epoch = self.epoch.lock().unwrap();
        if *current_epoch != epoch {
            debug!(status = ?status, "Stale driver status dropped");
            return;
        }
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            debug!(status = ?status, "Session status changed");
            self.status_feed.publish(status);
            let _ = self.signals.send(SessionSignal::Status(status));
        }
    }
}

/// The process-wide channel session.
pub struct Session {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    status_rx: watch::Receiver<ConnectionStatus>,
    live: Mutex<Option<Live>>,
}

impl Session {
    /// Create a session over the given transport.
    ///
    /// Status changes and inbound events are forwarded to `signals`.
    pub(crate) fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        signals: mpsc::UnboundedSender<SessionSignal>,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            config,
            transport,
            shared: Arc::new(Shared {
                status_tx,
                status_feed: Feed::new(),
                signals,
                epoch: Mutex::new(0),
            }),
            status_rx,
            live: Mutex::new(None),
        }
    }

    /// Open the channel, or return the existing handle when a driver is
    /// already running.
    ///
    /// Non-blocking: the driver dials in the background and reconnects per
    /// the configured policy until its retry budget is exhausted. Once the
    /// budget is spent the driver exits, and a later `connect` starts a
    /// fresh one.
    pub fn connect(&self, credential: Option<&str>) -> SessionHandle {
        let mut live = self.live.lock().unwrap();
        if let Some(existing) = live.as_ref() {
            if !existing.driver.is_finished() {
                debug!("Connect ignored: session already live");
                return existing.handle.clone();
            }
        }

        let endpoint = self.config.endpoint(credential);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            outbound: outbound_tx,
        };

        info!(
            base_url = %self.config.base_url,
            namespace = %self.config.namespace,
            transport = self.transport.name(),
            "Opening channel session"
        );
        metrics::record_connect();

        let epoch = self.shared.advance_epoch();
        let driver = tokio::spawn(drive(
            Arc::clone(&self.shared),
            epoch,
            Arc::clone(&self.transport),
            endpoint,
            outbound_rx,
            self.config.reconnect.clone(),
        ));

        *live = Some(Live {
            handle: handle.clone(),
            driver,
        });
        handle
    }

    /// Tear the channel down. Idempotent.
    pub fn disconnect(&self) {
        {
            let mut live = self.live.lock().unwrap();
            if let Some(live) = live.take() {
                live.driver.abort();
                info!("Channel session closed");
            }
        }
        let epoch = self.shared.advance_epoch();
        self.shared.set_status(epoch, ConnectionStatus::Disconnected);
    }

    /// Last-observed status. Never blocks.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// True when the last-observed status is `Connected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Subscribe to status transitions.
    #[must_use]
    pub fn subscribe_status(&self) -> Subscription<ConnectionStatus> {
        self.shared.status_feed.subscribe()
    }

    /// Emit an event over the live channel.
    ///
    /// Dropped with a log line when the session is not connected. Membership
    /// repair after a reconnect runs through the rejoin path, not through an
    /// outbound backlog.
    pub fn emit(&self, event: ClientEvent) {
        if !self.is_connected() {
            debug!(event = event.name(), "Event dropped: channel not connected");
            return;
        }
        let live = self.live.lock().unwrap();
        if let Some(live) = live.as_ref() {
            live.handle.emit(event);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            if let Some(live) = live.take() {
                live.driver.abort();
                self.shared.advance_epoch();
            }
        }
    }
}

/// Why one connection's pump stopped.
enum PumpExit {
    /// Transport closed or errored; the retry loop takes over.
    ConnectionLost,
    /// Every handle is gone; nothing can emit again.
    HandlesDropped,
}

/// Driver task: dial, pump, reconnect until the retry budget is spent.
async fn drive(
    shared: Arc<Shared>,
    epoch: u64,
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    policy: ReconnectPolicy,
) {
    let mut attempts: u32 = 0;

    loop {
        shared.set_status(epoch, ConnectionStatus::Connecting);

        match transport.dial(&endpoint).await {
            Ok(mut conn) => {
                attempts = 0;
                info!(transport = conn.transport(), "Channel connected");
                shared.set_status(epoch, ConnectionStatus::Connected);

                let exit = pump(conn.as_mut(), &mut outbound, &shared).await;
                let _ = conn.close().await;
                shared.set_status(epoch, ConnectionStatus::Disconnected);

                if matches!(exit, PumpExit::HandlesDropped) {
                    debug!("Session driver exiting: all handles dropped");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Channel dial failed");
            }
        }

        attempts += 1;
        metrics::record_reconnect_attempt();
        if attempts > policy.max_retries {
            warn!(attempts, "Retry budget exhausted; session stays disconnected");
            shared.set_status(epoch, ConnectionStatus::Disconnected);
            return;
        }

        debug!(attempt = attempts, delay_ms = policy.delay_ms, "Reconnect scheduled");
        tokio::time::sleep(policy.delay()).await;
    }
}

/// Pump one connection until it drops or the handles go away.
async fn pump(
    conn: &mut dyn Connection,
    outbound: &mut mpsc::UnboundedReceiver<ClientEvent>,
    shared: &Shared,
) -> PumpExit {
    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(event) => {
                    debug!(event = event.name(), "Emitting event");
                    metrics::record_message("outbound");
                    match conn.send(event).await {
                        Ok(()) => {}
                        // Encode failures are local; the link stays usable.
                        Err(e @ TransportError::Protocol(_)) => {
                            warn!(error = %e, "Undeliverable event dropped");
                            metrics::record_error("encode");
                        }
                        Err(e) => {
                            warn!(error = %e, "Send failed; recycling connection");
                            return PumpExit::ConnectionLost;
                        }
                    }
                }
                None => return PumpExit::HandlesDropped,
            },
            inbound = conn.recv() => match inbound {
                Ok(Some(event)) => {
                    let _ = shared.signals.send(SessionSignal::Event(event));
                }
                Ok(None) => {
                    debug!("Channel closed by server");
                    return PumpExit::ConnectionLost;
                }
                Err(e) => {
                    warn!(error = %e, "Receive failed; recycling connection");
                    return PumpExit::ConnectionLost;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{wait_for, ScriptedTransport};

    fn test_config() -> ClientConfig {
        ClientConfig {
            reconnect: ReconnectPolicy {
                delay_ms: 5,
                max_retries: 2,
            },
            ..ClientConfig::default()
        }
    }

    fn session_over(
        transport: &ScriptedTransport,
    ) -> (Session, mpsc::UnboundedReceiver<SessionSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let session = Session::new(test_config(), Arc::new(transport.clone()), signal_tx);
        (session, signal_rx)
    }

    #[tokio::test]
    async fn test_connect_reaches_connected() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        session.connect(Some("token"));
        wait_for(|| session.is_connected()).await;

        assert_eq!(transport.dial_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_while_live() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;
        session.connect(None);
        session.connect(None);

        // Still a single driver and a single dial.
        assert_eq!(transport.dial_count(), 1);
    }

    #[tokio::test]
    async fn test_emitted_events_reach_the_wire() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;
        session.emit(ClientEvent::join("m-1"));

        let link = transport.link(0).unwrap();
        wait_for(|| !link.sent().is_empty()).await;
        assert_eq!(link.sent(), vec![ClientEvent::join("m-1")]);
    }

    #[tokio::test]
    async fn test_emit_while_disconnected_is_dropped() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        // Not connected yet: nothing to send on, the event just disappears.
        session.emit(ClientEvent::join("m-1"));
        session.connect(None);
        wait_for(|| session.is_connected()).await;

        session.emit(ClientEvent::join("m-2"));
        let link = transport.link(0).unwrap();
        wait_for(|| !link.sent().is_empty()).await;
        assert_eq!(link.sent(), vec![ClientEvent::join("m-2")]);
    }

    #[tokio::test]
    async fn test_oversized_send_keeps_the_connection() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;

        // The first event blows the frame cap inside the transport's send;
        // the second proves the same connection keeps working.
        session.emit(ClientEvent::send("m-1", "x".repeat(70_000)));
        session.emit(ClientEvent::join("m-1"));

        let link = transport.link(0).unwrap();
        wait_for(|| !link.sent().is_empty()).await;

        assert_eq!(link.sent(), vec![ClientEvent::join("m-1")]);
        assert_eq!(transport.dial_count(), 1);
        assert!(session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_connection_drop() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);
        let mut statuses = session.subscribe_status();

        session.connect(None);
        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Connecting));
        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Connected));

        transport.link(0).unwrap().drop_connection();
        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Disconnected));
        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Connecting));
        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Connected));

        assert_eq!(transport.dial_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_refusals_are_retried_within_budget() {
        let transport = ScriptedTransport::new();
        transport.refuse_next(2);
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;
        assert_eq!(transport.dial_count(), 3);

        // Success reset the attempt counter: a later drop still reconnects.
        transport.link(0).unwrap().drop_connection();
        wait_for(|| transport.dial_count() == 4).await;
        wait_for(|| session.is_connected()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_is_terminal() {
        let transport = ScriptedTransport::new();
        transport.refuse_all();
        let (session, _signals) = session_over(&transport);

        session.connect(None);

        // max_retries = 2: the initial dial plus two retries, then stop.
        wait_for(|| transport.dial_count() == 3).await;
        wait_for(|| session.status() == ConnectionStatus::Disconnected).await;

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(transport.dial_count(), 3);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_after_terminal_disconnect_starts_fresh() {
        let transport = ScriptedTransport::new();
        transport.refuse_all();
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| transport.dial_count() == 3).await;
        wait_for(|| session.status() == ConnectionStatus::Disconnected).await;

        transport.refuse_none();
        session.connect(None);
        wait_for(|| session.is_connected()).await;

        assert_eq!(transport.dial_count(), 4);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;

        session.disconnect();
        session.disconnect();

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_retires_the_driver_epoch() {
        let transport = ScriptedTransport::new();
        let (session, _signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;
        let driver_epoch = *session.shared.epoch.lock().unwrap();

        session.disconnect();
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        // An aborted driver can still reach a status write between its dial
        // returning and its next await point. It must not stick.
        session
            .shared
            .set_status(driver_epoch, ConnectionStatus::Connected);

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_status_changes_flow_to_signals() {
        let transport = ScriptedTransport::new();
        let (session, mut signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;

        let first = signals.recv().await.unwrap();
        let second = signals.recv().await.unwrap();
        assert!(matches!(
            first,
            SessionSignal::Status(ConnectionStatus::Connecting)
        ));
        assert!(matches!(
            second,
            SessionSignal::Status(ConnectionStatus::Connected)
        ));
    }

    #[tokio::test]
    async fn test_inbound_events_flow_to_signals() {
        let transport = ScriptedTransport::new();
        let (session, mut signals) = session_over(&transport);

        session.connect(None);
        wait_for(|| session.is_connected()).await;

        transport
            .link(0)
            .unwrap()
            .push(ServerEvent::Error {
                message: "whoa".to_string(),
            });

        loop {
            match signals.recv().await.unwrap() {
                SessionSignal::Event(ServerEvent::Error { message }) => {
                    assert_eq!(message, "whoa");
                    break;
                }
                SessionSignal::Status(_) => {}
                SessionSignal::Event(other) => panic!("unexpected event: {other:?}"),
            }
        }
    }
}
