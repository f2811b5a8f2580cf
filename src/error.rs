use thiserror::Error;

/// Failure taxonomy for the sync engine. None of these are fatal to the
/// process: restore failures degrade to the unauthenticated view, fetch and
/// scan failures skip a cycle, subscription failures leave the bridge idle
/// until the next session transition, and delivery failures are dropped.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Session restore failed: {0}")]
    SessionRestore(String),

    #[error("Meeting fetch failed: {0}")]
    Fetch(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl EngineError {
    pub fn session_restore<S: Into<String>>(msg: S) -> Self {
        Self::SessionRestore(msg.into())
    }

    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn subscription<S: Into<String>>(msg: S) -> Self {
        Self::Subscription(msg.into())
    }

    pub fn delivery<S: Into<String>>(msg: S) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Message suitable for surfacing in a UI shell. Internal variants are
    /// collapsed so raw driver errors never reach the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionRestore(_) => "Could not restore your session. Please sign in again.".to_string(),
            Self::Fetch(_) => "Could not load your meetings. They will be retried shortly.".to_string(),
            Self::Subscription(_) => "Live updates are unavailable right now.".to_string(),
            Self::Delivery(_) => "A notification could not be shown.".to_string(),
            Self::Database(_) => "The meeting store is unavailable.".to_string(),
            Self::Config(msg) => format!("Invalid configuration: {}", msg),
            Self::Anyhow(_) => "Operation failed.".to_string(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
