//! Store seam for the sync engine.
//!
//! The engine treats persistence and transport as a black box behind
//! [`MeetingStore`]: restore a persisted session, fetch the full meeting set,
//! log out, and subscribe to meeting insert events. Insert delivery is
//! message-passing: the store pushes typed [`Meeting`] values into a
//! per-subscription channel instead of invoking callbacks, so business logic
//! never sees store-specific callback shapes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{Meeting, Session};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Buffer size of each insert-feed channel. Inserts are rare relative to
/// consumption, so a small buffer is enough to decouple writer and reader.
pub(crate) const DEFAULT_FEED_CAPACITY: usize = 64;

/// Identifies one live insert subscription within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One live insert subscription: the store-issued id plus the receiving end
/// of the event channel. Dropping the receiver ends delivery; the id must
/// still be released with [`MeetingStore::unsubscribe`].
pub struct InsertFeed {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<Meeting>,
}

/// Black-box meeting store consumed by the engine.
///
/// `current_session`, `meetings` and `logout` are suspension points; the
/// engine absorbs their failures per its error taxonomy. `unsubscribe` is
/// fire-and-forget: callers clear local state without awaiting confirmation.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// The persisted session, if any. Queried once at startup.
    async fn current_session(&self) -> EngineResult<Option<Session>>;

    /// The full meeting collection, ordered by start time.
    async fn meetings(&self) -> EngineResult<Vec<Meeting>>;

    /// Discards the persisted session.
    async fn logout(&self) -> EngineResult<()>;

    /// Opens a live feed of insert events on the named collection.
    async fn subscribe_inserts(&self, table: &str) -> EngineResult<InsertFeed>;

    /// Releases a subscription. Safe to call with an already-released id.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Subscriber bookkeeping shared by the concrete stores: hands out feeds,
/// fans inserted meetings out to every live subscriber, and prunes
/// subscribers whose receiving end is gone.
pub(crate) struct SubscriberRegistry {
    senders: Mutex<HashMap<SubscriptionId, mpsc::Sender<Meeting>>>,
    capacity: usize,
}

impl SubscriberRegistry {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub(crate) fn subscribe(&self) -> InsertFeed {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = SubscriptionId::new();
        self.senders.lock().unwrap().insert(id, tx);
        InsertFeed { id, events: rx }
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        self.senders.lock().unwrap().remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    /// Delivers the meeting to every live subscriber in registration order.
    /// Subscribers that have dropped their receiver are removed.
    pub(crate) async fn broadcast(&self, meeting: &Meeting) {
        let subscribers: Vec<(SubscriptionId, mpsc::Sender<Meeting>)> = {
            let senders = self.senders.lock().unwrap();
            senders.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut closed = Vec::new();
        for (id, tx) in subscribers {
            if tx.send(meeting.clone()).await.is_err() {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            let mut senders = self.senders.lock().unwrap();
            for id in closed {
                senders.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMeeting;
    use chrono::Utc;

    fn sample_meeting() -> Meeting {
        NewMeeting::new("Standup", Utc::now(), "u1").into_meeting()
    }

    #[tokio::test]
    async fn test_registry_delivers_to_all_subscribers() {
        let registry = SubscriberRegistry::new(8);
        let mut feed_a = registry.subscribe();
        let mut feed_b = registry.subscribe();
        assert_eq!(registry.len(), 2);

        registry.broadcast(&sample_meeting()).await;

        assert_eq!(feed_a.events.recv().await.unwrap().title, "Standup");
        assert_eq!(feed_b.events.recv().await.unwrap().title, "Standup");
    }

    #[tokio::test]
    async fn test_registry_unsubscribe_stops_delivery() {
        let registry = SubscriberRegistry::new(8);
        let mut feed = registry.subscribe();
        registry.unsubscribe(feed.id);
        assert_eq!(registry.len(), 0);

        registry.broadcast(&sample_meeting()).await;
        // Sender side is gone, so the channel yields None
        assert!(feed.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_registry_prunes_dropped_receivers() {
        let registry = SubscriberRegistry::new(8);
        let feed = registry.subscribe();
        drop(feed.events);

        registry.broadcast(&sample_meeting()).await;
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_is_harmless() {
        let registry = SubscriberRegistry::new(8);
        let feed = registry.subscribe();
        registry.unsubscribe(feed.id);
        registry.unsubscribe(feed.id);
        assert_eq!(registry.len(), 0);
    }
}
