use chrono::{Duration, TimeZone, Utc};
use tempfile::NamedTempFile;

use meetchime::{MeetingStore, NewMeeting, SqliteStore, UserProfile};

fn temp_db_url() -> String {
    let temp_file = NamedTempFile::new().unwrap();
    let (_, path) = temp_file.keep().unwrap();
    format!("sqlite:{}?mode=rwc", path.to_str().unwrap())
}

async fn create_test_store() -> SqliteStore {
    SqliteStore::open(&temp_db_url()).await.unwrap()
}

#[tokio::test]
async fn test_session_survives_reopen() {
    let db_url = temp_db_url();

    // 1. Sign in against one store instance
    let store = SqliteStore::open(&db_url).await.unwrap();
    let session = store
        .login(UserProfile::new("u1", "Ada Lovelace"))
        .await
        .unwrap();
    drop(store);

    // 2. A fresh instance over the same file restores the same session
    let reopened = SqliteStore::open(&db_url).await.unwrap();
    let restored = reopened.current_session().await.unwrap().unwrap();
    assert_eq!(restored.token, session.token);
    assert_eq!(restored.profile.name, "Ada Lovelace");
    assert!(!restored.is_guest());

    // 3. Logout clears it for any later instance
    reopened.logout().await.unwrap();
    let after = SqliteStore::open(&db_url).await.unwrap();
    assert!(after.current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_meeting_workflow() {
    let store = create_test_store().await;
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    // 1. Create two meetings out of order, one with the works
    let mut planning = NewMeeting::new("Planning", base + Duration::hours(3), "u1");
    planning.description = Some("Quarterly planning".to_string());
    planning.location = Some("Room 4".to_string());
    planning.ends_at = Some(base + Duration::hours(4));
    planning.participant_ids = vec!["u2".to_string(), "u3".to_string()];
    store.create_meeting(planning).await.unwrap();

    store
        .create_meeting(NewMeeting::new("Standup", base, "u1"))
        .await
        .unwrap();

    // 2. Fetch comes back ordered by start time
    let meetings = store.meetings().await.unwrap();
    assert_eq!(meetings.len(), 2);
    assert_eq!(meetings[0].title, "Standup");
    assert_eq!(meetings[1].title, "Planning");

    // 3. Optional fields and participants round-trip intact
    let planning = &meetings[1];
    assert_eq!(planning.description.as_deref(), Some("Quarterly planning"));
    assert_eq!(planning.location.as_deref(), Some("Room 4"));
    assert_eq!(planning.ends_at, Some(base + Duration::hours(4)));
    assert_eq!(planning.participant_ids, vec!["u2", "u3"]);
    assert!(planning.involves("u3"));
    assert!(!planning.involves("u9"));
}

#[tokio::test]
async fn test_insert_feed_fanout() {
    let store = create_test_store().await;
    let mut feed_a = store.subscribe_inserts("meetings").await.unwrap();
    let mut feed_b = store.subscribe_inserts("meetings").await.unwrap();
    assert_eq!(store.active_subscriptions(), 2);

    let created = store
        .create_meeting(NewMeeting::new("Standup", Utc::now(), "u1"))
        .await
        .unwrap();

    let from_a = feed_a.events.recv().await.unwrap();
    let from_b = feed_b.events.recv().await.unwrap();
    assert_eq!(from_a.id, created.id);
    assert_eq!(from_b.id, created.id);

    // A released feed stops receiving; the other keeps going
    store.unsubscribe(feed_a.id);
    assert_eq!(store.active_subscriptions(), 1);

    store
        .create_meeting(NewMeeting::new("Retro", Utc::now(), "u1"))
        .await
        .unwrap();
    assert_eq!(feed_b.events.recv().await.unwrap().title, "Retro");
    assert!(feed_a.events.recv().await.is_none());
}

#[tokio::test]
async fn test_schema_is_idempotent_across_opens() {
    let db_url = temp_db_url();

    let store = SqliteStore::open(&db_url).await.unwrap();
    store
        .create_meeting(NewMeeting::new("Standup", Utc::now(), "u1"))
        .await
        .unwrap();
    drop(store);

    // Reopening re-runs the schema against existing tables without damage
    let reopened = SqliteStore::open(&db_url).await.unwrap();
    assert_eq!(reopened.meetings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_collection_is_rejected() {
    let store = create_test_store().await;
    assert!(store.subscribe_inserts("documents").await.is_err());
    assert_eq!(store.active_subscriptions(), 0);
}
