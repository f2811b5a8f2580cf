//! In-memory [`MeetingStore`] for tests and demos. Same contract as the
//! SQLite store, no persistence.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EngineError, EngineResult};
use crate::models::{Meeting, NewMeeting, Session, UserProfile};

use super::{
    InsertFeed, MeetingStore, SubscriberRegistry, SubscriptionId, DEFAULT_FEED_CAPACITY,
};

pub struct MemoryStore {
    session: Mutex<Option<Session>>,
    meetings: Mutex<Vec<Meeting>>,
    registry: SubscriberRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            meetings: Mutex::new(Vec::new()),
            registry: SubscriberRegistry::new(DEFAULT_FEED_CAPACITY),
        }
    }

    /// Installs a session without going through a login flow.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub fn login(&self, profile: UserProfile) -> Session {
        let session = Session::new(profile);
        *self.session.lock().unwrap() = Some(session.clone());
        session
    }

    /// Inserts a meeting and pushes it to every live insert feed.
    pub async fn insert_meeting(&self, draft: NewMeeting) -> Meeting {
        let meeting = draft.into_meeting();
        self.meetings.lock().unwrap().push(meeting.clone());
        self.registry.broadcast(&meeting).await;
        meeting
    }

    pub fn active_subscriptions(&self) -> usize {
        self.registry.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn current_session(&self) -> EngineResult<Option<Session>> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn meetings(&self) -> EngineResult<Vec<Meeting>> {
        let mut all = self.meetings.lock().unwrap().clone();
        all.sort_by_key(|m| m.starts_at);
        Ok(all)
    }

    async fn logout(&self) -> EngineResult<()> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn subscribe_inserts(&self, table: &str) -> EngineResult<InsertFeed> {
        if table != "meetings" {
            return Err(EngineError::subscription(format!(
                "unknown collection: {}",
                table
            )));
        }
        Ok(self.registry.subscribe())
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_session_round_trip() {
        let store = MemoryStore::new();
        assert!(store.current_session().await.unwrap().is_none());

        let session = store.login(UserProfile::new("u1", "Ada"));
        let restored = store.current_session().await.unwrap().unwrap();
        assert_eq!(restored.token, session.token);

        store.logout().await.unwrap();
        assert!(store.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_meetings_sorted_by_start_time() {
        let store = MemoryStore::new();
        let base = Utc::now();

        store
            .insert_meeting(NewMeeting::new("Later", base + Duration::hours(2), "u1"))
            .await;
        store
            .insert_meeting(NewMeeting::new("Sooner", base + Duration::hours(1), "u1"))
            .await;

        let meetings = store.meetings().await.unwrap();
        assert_eq!(meetings[0].title, "Sooner");
        assert_eq!(meetings[1].title, "Later");
    }

    #[tokio::test]
    async fn test_insert_reaches_subscriber() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe_inserts("meetings").await.unwrap();

        store
            .insert_meeting(NewMeeting::new("Standup", Utc::now(), "u1"))
            .await;

        assert_eq!(feed.events.recv().await.unwrap().title, "Standup");

        store.unsubscribe(feed.id);
        assert_eq!(store.active_subscriptions(), 0);
    }
}
