//! Test doubles shared across the crate's unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use wavelink_protocol::{codec, ChatMessage, ClientEvent, Notification, ServerEvent};
use wavelink_transport::{Connection, Endpoint, Transport, TransportError};

use crate::history::{HistoryError, HistoryStore};

/// Poll `probe` until it holds; panics after two seconds.
pub(crate) async fn wait_for(mut probe: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !probe() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Server-side controls for one scripted connection.
pub(crate) struct Link {
    incoming: mpsc::UnboundedSender<Option<ServerEvent>>,
    sent: Arc<Mutex<Vec<ClientEvent>>>,
}

impl Link {
    /// Push a server event into the connection.
    pub(crate) fn push(&self, event: ServerEvent) {
        let _ = self.incoming.send(Some(event));
    }

    /// Drop the connection from the server side.
    pub(crate) fn drop_connection(&self) {
        let _ = self.incoming.send(None);
    }

    /// Everything the client sent over this connection, in order.
    pub(crate) fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().unwrap().clone()
    }
}

struct ScriptedConnection {
    incoming: mpsc::UnboundedReceiver<Option<ServerEvent>>,
    sent: Arc<Mutex<Vec<ClientEvent>>>,
    open: bool,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn recv(&mut self) -> Result<Option<ServerEvent>, TransportError> {
        match self.incoming.recv().await {
            Some(Some(event)) => Ok(Some(event)),
            Some(None) | None => {
                self.open = false;
                Ok(None)
            }
        }
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        codec::encode(&event)?;
        self.sent.lock().unwrap().push(event);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "scripted"
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[derive(Default)]
struct ScriptedInner {
    dials: AtomicUsize,
    refusals: AtomicUsize,
    links: Mutex<Vec<Arc<Link>>>,
}

/// Transport double that hands out scripted connections and records dials.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<ScriptedInner>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Refuse every dial until further notice.
    pub(crate) fn refuse_all(&self) {
        self.inner.refusals.store(usize::MAX, Ordering::SeqCst);
    }

    /// Accept dials again.
    pub(crate) fn refuse_none(&self) {
        self.inner.refusals.store(0, Ordering::SeqCst);
    }

    /// Refuse the next `count` dials, then accept.
    pub(crate) fn refuse_next(&self, count: usize) {
        self.inner.refusals.store(count, Ordering::SeqCst);
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.inner.dials.load(Ordering::SeqCst)
    }

    /// Controls for the `n`th accepted connection (0-based).
    pub(crate) fn link(&self, n: usize) -> Option<Arc<Link>> {
        self.inner.links.lock().unwrap().get(n).cloned()
    }

    pub(crate) fn link_count(&self) -> usize {
        self.inner.links.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dial(&self, _endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError> {
        self.inner.dials.fetch_add(1, Ordering::SeqCst);

        let remaining = self.inner.refusals.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.inner.refusals.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(TransportError::Handshake("scripted refusal".to_string()));
        }

        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let link = Arc::new(Link {
            incoming: incoming_tx,
            sent: Arc::clone(&sent),
        });
        self.inner.links.lock().unwrap().push(link);

        Ok(Box::new(ScriptedConnection {
            incoming: incoming_rx,
            sent,
            open: true,
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Call counters for [`MockHistory`].
#[derive(Default)]
pub(crate) struct Calls {
    pub(crate) messages: AtomicUsize,
    pub(crate) notifications: AtomicUsize,
    pub(crate) mark_read: AtomicUsize,
    pub(crate) delete: AtomicUsize,
    pub(crate) clear: AtomicUsize,
}

/// History double with scriptable responses and call counters.
#[derive(Default)]
pub(crate) struct MockHistory {
    messages: Mutex<Vec<ChatMessage>>,
    notifications: Mutex<Vec<Notification>>,
    fail: AtomicBool,
    hold: AtomicBool,
    release: Notify,
    pub(crate) calls: Calls,
}

impl MockHistory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Messages returned for any room.
    pub(crate) fn set_messages(&self, messages: Vec<ChatMessage>) {
        *self.messages.lock().unwrap() = messages;
    }

    pub(crate) fn set_notifications(&self, items: Vec<Notification>) {
        *self.notifications.lock().unwrap() = items;
    }

    /// Make every call fail with an HTTP 500.
    pub(crate) fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Hold fetches open until [`MockHistory::release`] is called.
    pub(crate) fn hold_responses(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    async fn gate(&self) {
        loop {
            let released = self.release.notified();
            if !self.hold.load(Ordering::SeqCst) {
                return;
            }
            released.await;
        }
    }

    fn check_fail(&self) -> Result<(), HistoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HistoryError::Http {
                status: 500,
                body: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MockHistory {
    async fn match_messages(&self, _room_id: &str) -> Result<Vec<ChatMessage>, HistoryError> {
        self.calls.messages.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.check_fail()?;
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn notifications(&self) -> Result<Vec<Notification>, HistoryError> {
        self.calls.notifications.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.check_fail()?;
        Ok(self.notifications.lock().unwrap().clone())
    }

    async fn mark_read(&self, _id: &str) -> Result<(), HistoryError> {
        self.calls.mark_read.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.check_fail()
    }

    async fn delete_notification(&self, _id: &str) -> Result<(), HistoryError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.check_fail()
    }

    async fn clear_notifications(&self) -> Result<(), HistoryError> {
        self.calls.clear.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.check_fail()
    }
}
