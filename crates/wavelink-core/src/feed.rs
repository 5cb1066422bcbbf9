//! Typed publish-subscribe feeds.
//!
//! Lifecycle and state updates fan out through [`Feed`]s: a typed broadcast
//! with an explicit subscriber registry. Every subscription has an id, the
//! registered set is enumerable, and a dropped [`Subscription`] unregisters
//! itself deterministically.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::trace;

/// Default buffered capacity per feed.
const DEFAULT_FEED_CAPACITY: usize = 256;

/// Identifier of one subscription.
pub type SubscriberId = u64;

/// A typed broadcast feed with an enumerable subscriber registry.
pub struct Feed<T> {
    sender: broadcast::Sender<T>,
    registry: Arc<Mutex<HashSet<SubscriberId>>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + 'static> Feed<T> {
    /// Create a feed with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create a feed that buffers up to `capacity` values per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(Mutex::new(HashSet::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().unwrap().insert(id);
        trace!(subscriber = id, "Subscriber registered");

        Subscription {
            id,
            receiver: self.sender.subscribe(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Publish a value to every live subscriber.
    ///
    /// Returns the number of receivers the value reached.
    pub fn publish(&self, value: T) -> usize {
        self.sender.send(value).unwrap_or_default()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    /// Ids of the registered subscribers.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.registry.lock().unwrap().iter().copied().collect()
    }
}

impl<T: Clone + Send + 'static> Default for Feed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A live registration on a [`Feed`].
///
/// Dropping the subscription unregisters it.
pub struct Subscription<T> {
    id: SubscriberId,
    receiver: broadcast::Receiver<T>,
    registry: Arc<Mutex<HashSet<SubscriberId>>>,
}

impl<T: Clone> Subscription<T> {
    /// This subscription's id.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receive the next published value.
    ///
    /// Returns `None` once the feed is gone. A subscriber that falls behind
    /// the buffer skips to the oldest retained value instead of failing.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(subscriber = self.id, skipped, "Subscriber lagged");
                }
            }
        }
    }

    /// Receive without waiting; `None` when nothing is buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.registry.lock().unwrap().remove(&self.id);
        trace!(subscriber = self.id, "Subscriber unregistered");
    }
}
