// MeetChime - headless meeting session and notification sync engine
// Daemon entry point

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use meetchime::notify::TerminalSink;
use meetchime::store::SqliteStore;
use meetchime::utils::logging;
use meetchime::{build_engine, EngineConfig, EngineEvent};

#[tokio::main]
async fn main() {
    if logging::init_logging().is_err() {
        eprintln!("Failed to initialize logging, continuing without it");
    }

    info!("Starting MeetChime sync engine");

    let config = EngineConfig::from_env();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }

    let store = match SqliteStore::open_default().await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            logging::log_error_with_context(&e, "store-init");
            eprintln!("Failed to initialize meeting store: {}", e);
            eprintln!("Please check your system and try again.");
            std::process::exit(1);
        }
    };

    let sink = Arc::new(TerminalSink::new());
    let shutdown = CancellationToken::new();
    let (events_tx, mut events_rx) = mpsc::channel(64);

    let engine = build_engine(store, sink, config, Some(events_tx), shutdown.clone());

    // Surface engine events in the log
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                EngineEvent::SessionChanged(Some(session)) => {
                    info!("Session active: {}", session.profile.name)
                }
                EngineEvent::SessionChanged(None) => info!("Signed out"),
                EngineEvent::SubscriptionChanged { live } => {
                    info!("Realtime subscription live: {}", live)
                }
                EngineEvent::ReminderFired(meeting) => {
                    info!("Reminder fired: '{}'", meeting.title)
                }
                EngineEvent::MeetingDiscovered {
                    meeting,
                    via_realtime,
                } => info!(
                    "Meeting discovered: '{}' (realtime: {})",
                    meeting.title, via_realtime
                ),
                EngineEvent::ScanCompleted { .. } => {}
                EngineEvent::Error(message) => warn!("Engine error: {}", message),
            }
        }
    });

    // Ctrl+C flips the shutdown token; the engine loop drains on it
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            signal_token.cancel();
        }
    });

    engine.start().await;
    engine.run().await;

    info!("MeetChime stopped");
}
