// MeetChime Sync Engine Library
// Exposes the engine for the daemon binary and integration tests

pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod realtime;
pub mod scanner;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use messages::EngineEvent;
pub use models::*;
pub use notify::{
    NotificationGateway, NotificationLedger, NotificationSink, PermissionStatus, TerminalSink,
};
pub use orchestrator::SessionOrchestrator;
pub use realtime::RealtimeBridge;
pub use scanner::{ReminderPolicy, ReminderScanner, ScanOutcome};
pub use store::{MeetingStore, MemoryStore, SqliteStore, SubscriptionId};

use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Wires a complete engine: notification gateway in front of the sink,
/// orchestrator on top of the store.
pub fn build_engine(
    store: Arc<dyn MeetingStore>,
    sink: Arc<dyn NotificationSink>,
    config: EngineConfig,
    events: Option<Sender<EngineEvent>>,
    shutdown: CancellationToken,
) -> SessionOrchestrator {
    let policy = ReminderPolicy::from_config(&config);
    let gateway = Arc::new(NotificationGateway::new(sink, policy, events.clone()));
    SessionOrchestrator::new(store, gateway, config, events, shutdown)
}
