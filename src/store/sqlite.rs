//! SQLite-backed [`MeetingStore`] with live insert fan-out.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePool, FromRow, Sqlite};

use crate::error::{EngineError, EngineResult};
use crate::models::{Meeting, NewMeeting, Session, UserProfile};

use super::{
    InsertFeed, MeetingStore, SubscriberRegistry, SubscriptionId, DEFAULT_FEED_CAPACITY,
};

pub struct SqliteStore {
    pub pool: SqlitePool,
    registry: SubscriberRegistry,
}

impl SqliteStore {
    /// Opens (creating if necessary) the database at the given sqlx URL,
    /// e.g. `sqlite:meetchime.db?mode=rwc`.
    pub async fn open(db_url: &str) -> Result<Self> {
        let db_exists = Sqlite::database_exists(db_url)
            .await
            .context("Failed to check if database exists")?;
        if !db_exists {
            info!("Creating database");
            Sqlite::create_database(db_url)
                .await
                .context("Failed to create database")?;
        }

        let pool = SqlitePool::connect(db_url)
            .await
            .context("Failed to connect to database")?;

        run_schema(&pool)
            .await
            .context("Failed to run database schema")?;

        info!("Meeting store initialized");

        Ok(SqliteStore {
            pool,
            registry: SubscriberRegistry::new(DEFAULT_FEED_CAPACITY),
        })
    }

    /// Opens the store at `MEETCHIME_DB_PATH`, or at the platform data
    /// directory when unset.
    pub async fn open_default() -> Result<Self> {
        let path = match env::var("MEETCHIME_DB_PATH") {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => {
                let dir = dirs::data_dir()
                    .context("Could not determine data directory")?
                    .join("meetchime");
                fs::create_dir_all(&dir).context("Failed to create data directory")?;
                dir.join("meetchime.db")
            }
        };

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        Self::open(&db_url).await
    }

    /// Persists a fresh session for the profile, replacing any previous one.
    pub async fn login(&self, profile: UserProfile) -> EngineResult<Session> {
        let session = Session::new(profile);

        sqlx::query("DELETE FROM sessions").execute(&self.pool).await?;
        sqlx::query(
            "INSERT INTO sessions (token, user_id, name, avatar_url, is_guest, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.profile.id)
        .bind(&session.profile.name)
        .bind(&session.profile.avatar_url)
        .bind(session.profile.is_guest)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        info!("Session persisted for {}", session.profile.name);
        Ok(session)
    }

    /// Inserts a meeting and pushes it to every live insert feed.
    pub async fn create_meeting(&self, draft: NewMeeting) -> EngineResult<Meeting> {
        let meeting = draft.into_meeting();
        let participants = serde_json::to_string(&meeting.participant_ids)
            .context("Failed to encode participant list")?;

        sqlx::query(
            "INSERT INTO meetings
                (id, title, description, starts_at, ends_at, location, owner_id, participant_ids, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meeting.id)
        .bind(&meeting.title)
        .bind(&meeting.description)
        .bind(meeting.starts_at)
        .bind(meeting.ends_at)
        .bind(&meeting.location)
        .bind(&meeting.owner_id)
        .bind(participants)
        .bind(meeting.created_at)
        .execute(&self.pool)
        .await?;

        self.registry.broadcast(&meeting).await;
        Ok(meeting)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.registry.len()
    }
}

#[async_trait]
impl MeetingStore for SqliteStore {
    async fn current_session(&self) -> EngineResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT token, user_id, name, avatar_url, is_guest, created_at
             FROM sessions ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    async fn meetings(&self) -> EngineResult<Vec<Meeting>> {
        let rows = sqlx::query_as::<_, MeetingRow>(
            "SELECT id, title, description, starts_at, ends_at, location, owner_id,
                    participant_ids, created_at
             FROM meetings ORDER BY starts_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Meeting::from).collect())
    }

    async fn logout(&self) -> EngineResult<()> {
        sqlx::query("DELETE FROM sessions").execute(&self.pool).await?;
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

async fn run_schema(pool: &SqlitePool) -> Result<()> {
    let schema = include_str!("schema.sql");

    let mut current_statement = String::new();
    for line in schema.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }

        current_statement.push_str(line);
        current_statement.push('\n');

        if trimmed.ends_with(';') {
            sqlx::query(&current_statement).execute(pool).await?;
            current_statement.clear();
        }
    }

    Ok(())
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    user_id: String,
    name: String,
    avatar_url: Option<String>,
    is_guest: bool,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            token: row.token,
            profile: UserProfile {
                id: row.user_id,
                name: row.name,
                avatar_url: row.avatar_url,
                is_guest: row.is_guest,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct MeetingRow {
    id: String,
    title: String,
    description: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    location: Option<String>,
    owner_id: String,
    participant_ids: String,
    created_at: DateTime<Utc>,
}

impl From<MeetingRow> for Meeting {
    fn from(row: MeetingRow) -> Self {
        let participant_ids = serde_json::from_str(&row.participant_ids).unwrap_or_else(|err| {
            warn!("Malformed participant list for meeting {}: {}", row.id, err);
            Vec::new()
        });

        Meeting {
            id: row.id,
            title: row.title,
            description: row.description,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            location: row.location,
            owner_id: row.owner_id,
            participant_ids,
            created_at: row.created_at,
        }
    }
}
