//! Client assembly.
//!
//! [`RealtimeClient`] wires the session, membership, chat store, and inbox
//! together behind one typed update feed. It is an explicitly owned
//! service: construct one per process, inject it where needed, and call
//! [`RealtimeClient::shutdown`] on teardown.
//!
//! A single dispatcher task applies session signals in arrival order, so no
//! two handlers for the same container ever run concurrently.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wavelink_protocol::{ChatMessage, MatchId, ServerEvent};
use wavelink_transport::Transport;

use crate::chat::{outgoing_message, ChatStore};
use crate::config::ClientConfig;
use crate::feed::{Feed, Subscription};
use crate::history::HistoryStore;
use crate::inbox::Inbox;
use crate::membership::Membership;
use crate::metrics;
use crate::session::{ConnectionStatus, Session, SessionHandle, SessionSignal};

/// State updates published to consumers after they are applied.
#[derive(Debug, Clone)]
pub enum Update {
    /// The session status changed.
    ConnectionChanged(ConnectionStatus),
    /// A message was appended to a room log.
    MessageAppended {
        /// Room the message landed in.
        room_id: MatchId,
        /// The appended message.
        message: ChatMessage,
    },
    /// The inbox contents or read-state changed.
    InboxChanged,
    /// Opaque match state pushed by the server.
    MatchChanged(serde_json::Value),
    /// Opaque application state pushed by the server.
    ApplicationChanged(serde_json::Value),
}

/// The realtime client.
pub struct RealtimeClient {
    session: Arc<Session>,
    membership: Arc<Membership>,
    chat: Arc<ChatStore>,
    inbox: Arc<Inbox>,
    updates: Arc<Feed<Update>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeClient {
    /// Build the client and start its dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Session::new(config, transport, signal_tx));
        let membership = Arc::new(Membership::new());
        let chat = Arc::new(ChatStore::new(Arc::clone(&history)));
        let inbox = Arc::new(Inbox::new(history));
        let updates = Arc::new(Feed::new());

        let dispatcher = tokio::spawn(dispatch(
            signal_rx,
            Arc::clone(&session),
            Arc::clone(&membership),
            Arc::clone(&chat),
            Arc::clone(&inbox),
            Arc::clone(&updates),
        ));

        info!("Realtime client ready");

        Self {
            session,
            membership,
            chat,
            inbox,
            updates,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Open the channel session. Idempotent and non-blocking.
    pub fn connect(&self, credential: Option<&str>) -> SessionHandle {
        self.session.connect(credential)
    }

    /// Tear the channel down. Idempotent.
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// Last-observed connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.session.status()
    }

    /// True when the channel is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Join a chat room, leaving the previous one first.
    ///
    /// The previous room's log is deactivated; the new room starts a fresh
    /// activation. Joining the already joined room is a no-op.
    pub fn join_match(&self, room_id: &str) {
        if let Some(previous) = self.membership.current() {
            if previous != room_id {
                self.chat.deactivate(&previous);
            }
        }
        for event in self.membership.join(room_id) {
            self.session.emit(event);
        }
    }

    /// Leave a chat room. Ignored unless it is the joined room.
    pub fn leave_match(&self, room_id: &str) {
        if let Some(event) = self.membership.leave(room_id) {
            self.chat.deactivate(room_id);
            self.session.emit(event);
        }
    }

    /// The currently joined room.
    #[must_use]
    pub fn current_match(&self) -> Option<MatchId> {
        self.membership.current()
    }

    /// Send a chat message.
    ///
    /// Blank text is dropped silently. The message is not appended locally;
    /// it shows up when the server broadcast comes back.
    pub fn send_message(&self, room_id: &str, text: &str) {
        if let Some(event) = outgoing_message(room_id, text) {
            self.session.emit(event);
        }
    }

    /// Room history, fetched once per activation.
    pub async fn load_history(&self, room_id: &str) -> Vec<ChatMessage> {
        self.chat.load_history(room_id).await
    }

    /// Snapshot of a room's message log.
    #[must_use]
    pub fn messages(&self, room_id: &str) -> Vec<ChatMessage> {
        self.chat.messages(room_id)
    }

    /// The notification inbox.
    #[must_use]
    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Subscribe to applied state updates.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<Update> {
        self.updates.subscribe()
    }

    /// Subscribe to connection status transitions.
    #[must_use]
    pub fn subscribe_status(&self) -> Subscription<ConnectionStatus> {
        self.session.subscribe_status()
    }

    /// Teardown hook: close the channel and stop the dispatcher. Idempotent.
    pub fn shutdown(&self) {
        self.session.disconnect();
        if let Some(dispatcher) = self.dispatcher.lock().unwrap().take() {
            dispatcher.abort();
            info!("Realtime client shut down");
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Ok(mut dispatcher) = self.dispatcher.lock() {
            if let Some(task) = dispatcher.take() {
                task.abort();
            }
        }
    }
}

/// Apply session signals in arrival order.
async fn dispatch(
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    session: Arc<Session>,
    membership: Arc<Membership>,
    chat: Arc<ChatStore>,
    inbox: Arc<Inbox>,
    updates: Arc<Feed<Update>>,
) {
    while let Some(signal) = signals.recv().await {
        match signal {
            SessionSignal::Status(status) => {
                if status.is_connected() {
                    // Server-side membership died with the old connection.
                    if let Some(rejoin) = membership.rejoin() {
                        session.emit(rejoin);
                    }
                }
                updates.publish(Update::ConnectionChanged(status));
            }
            SessionSignal::Event(event) => {
                apply_event(event, &membership, &chat, &inbox, &updates);
            }
        }
    }
    debug!("Dispatcher stopped: session gone");
}

/// Apply one inbound event to its container, then publish the update.
fn apply_event(
    event: ServerEvent,
    membership: &Membership,
    chat: &ChatStore,
    inbox: &Inbox,
    updates: &Feed<Update>,
) {
    match event {
        ServerEvent::NewMessage {
            user_id,
            text,
            created_at,
        } => {
            let Some(room_id) = membership.current() else {
                debug!("Message broadcast with no joined room dropped");
                return;
            };
            let message = ChatMessage::new(room_id.clone(), text)
                .with_id(Uuid::new_v4().to_string())
                .with_sender(user_id)
                .with_created_at(created_at.unwrap_or_else(Utc::now));
            chat.append(&room_id, message.clone());
            updates.publish(Update::MessageAppended { room_id, message });
        }
        ServerEvent::Notification(notification) => {
            if inbox.add_from_remote(notification) {
                updates.publish(Update::InboxChanged);
            }
        }
        ServerEvent::MatchUpdated(payload) => {
            updates.publish(Update::MatchChanged(payload));
        }
        ServerEvent::ApplicationUpdated(payload) => {
            updates.publish(Update::ApplicationChanged(payload));
        }
        ServerEvent::Error { message } => {
            warn!(message = %message, "Server reported an error");
            metrics::record_error("server");
        }
    }
}
