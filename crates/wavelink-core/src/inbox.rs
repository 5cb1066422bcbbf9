//! Notification inbox.
//!
//! Additive operations are local-first; destructive operations go to the
//! history API first and mutate local state only on success, so a failure
//! leaves the inbox untouched. The unread count is always derived from
//! entry statuses, never tracked separately.

use std::sync::{Arc, RwLock};

use tracing::{debug, trace, warn};
use wavelink_protocol::{Notification, NotificationStatus};

use crate::history::{HistoryError, HistoryStore};
use crate::metrics;

#[derive(Default)]
struct InboxState {
    items: Vec<Notification>,
    loading: bool,
}

/// Process-wide notification inbox.
pub struct Inbox {
    state: RwLock<InboxState>,
    history: Arc<dyn HistoryStore>,
}

impl Inbox {
    /// Create an inbox backed by the given history API.
    #[must_use]
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            state: RwLock::new(InboxState::default()),
            history,
        }
    }

    /// Fetch the full inbox snapshot, replacing local state.
    ///
    /// Calls made while a fetch is in flight are coalesced: they return the
    /// current snapshot immediately and issue no request. A failed fetch
    /// logs the error and keeps the last-known-good items.
    pub async fn fetch_all(&self) -> Vec<Notification> {
        {
            let mut state = self.state.write().unwrap();
            if state.loading {
                trace!("Inbox fetch already in flight; coalesced");
                return state.items.clone();
            }
            state.loading = true;
        }

        let result = self.history.notifications().await;

        let mut state = self.state.write().unwrap();
        state.loading = false;
        match result {
            Ok(items) => {
                debug!(count = items.len(), "Inbox snapshot applied");
                state.items = items;
            }
            Err(e) => {
                warn!(error = %e, "Inbox fetch failed; keeping last-known-good items");
                metrics::record_history_failure("notifications");
            }
        }
        state.items.clone()
    }

    /// Insert a pushed notification, most recent first.
    ///
    /// Returns `false` when an entry with the same id already exists, which
    /// makes redelivery a no-op.
    pub fn add_from_remote(&self, notification: Notification) -> bool {
        let mut state = self.state.write().unwrap();
        if state.items.iter().any(|n| n.id == notification.id) {
            trace!(id = %notification.id, "Duplicate notification ignored");
            return false;
        }

        debug!(id = %notification.id, kind = %notification.kind, "Notification received");
        metrics::record_notification();
        state.items.insert(0, notification);
        true
    }

    /// Mark one notification read.
    ///
    /// A no-op `Ok` when the id is absent or the entry is already read.
    /// Otherwise the server is updated first and the local transition
    /// happens only on success.
    ///
    /// # Errors
    ///
    /// Returns the history API error; local state is unchanged.
    pub async fn mark_read(&self, id: &str) -> Result<(), HistoryError> {
        {
            let state = self.state.read().unwrap();
            match state.items.iter().find(|n| n.id == id) {
                None => {
                    debug!(id = %id, "Mark-read ignored: unknown id");
                    return Ok(());
                }
                Some(n) if n.status == NotificationStatus::Sent => {
                    trace!(id = %id, "Mark-read ignored: already read");
                    return Ok(());
                }
                Some(_) => {}
            }
        }

        self.history.mark_read(id).await?;

        let mut state = self.state.write().unwrap();
        if let Some(n) = state.items.iter_mut().find(|n| n.id == id) {
            n.status = NotificationStatus::Sent;
        }
        debug!(id = %id, "Notification marked read");
        Ok(())
    }

    /// Remove one notification, server first.
    ///
    /// # Errors
    ///
    /// Returns the history API error; local state is unchanged.
    pub async fn remove(&self, id: &str) -> Result<(), HistoryError> {
        self.history.delete_notification(id).await?;

        let mut state = self.state.write().unwrap();
        state.items.retain(|n| n.id != id);
        debug!(id = %id, "Notification removed");
        Ok(())
    }

    /// Clear every notification, server first.
    ///
    /// # Errors
    ///
    /// Returns the history API error; local state is unchanged.
    pub async fn clear_all(&self) -> Result<(), HistoryError> {
        self.history.clear_notifications().await?;

        let mut state = self.state.write().unwrap();
        let cleared = state.items.len();
        state.items.clear();
        debug!(cleared, "Inbox cleared");
        Ok(())
    }

    /// Snapshot of the inbox, most recent first.
    #[must_use]
    pub fn items(&self) -> Vec<Notification> {
        self.state.read().unwrap().items.clone()
    }

    /// Count of unread entries, derived from item statuses.
    #[must_use]
    pub fn unread(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .items
            .iter()
            .filter(|n| n.status.is_unread())
            .count()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap().items.len()
    }

    /// True when the inbox holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
