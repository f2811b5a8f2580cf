//! Session lifecycle orchestration.
//!
//! The orchestrator is the engine's root: it restores the persisted session
//! at startup, reacts to sign-in/sign-out by tearing down and rebuilding the
//! per-user machinery (scan state, realtime subscription), and drives the
//! periodic reconciliation loop. Transitions are serialized so a login
//! racing a logout cannot interleave their teardown and setup steps.
//!
//! Nothing in here is fatal. Restore failures degrade to the signed-out
//! view, fetch failures skip a cycle, and subscription failures leave the
//! periodic scan as the only delivery path until the next transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::messages::EngineEvent;
use crate::models::Session;
use crate::notify::NotificationGateway;
use crate::realtime::RealtimeBridge;
use crate::store::MeetingStore;
use crate::utils::logging::{log_scan_pass, log_session_event};

pub struct SessionOrchestrator {
    store: Arc<dyn MeetingStore>,
    gateway: Arc<NotificationGateway>,
    bridge: RealtimeBridge,
    config: EngineConfig,
    current: StdMutex<Option<Session>>,
    loading: AtomicBool,
    /// Serializes session transitions end to end.
    transition: Mutex<()>,
    events: Option<Sender<EngineEvent>>,
    shutdown: CancellationToken,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn MeetingStore>,
        gateway: Arc<NotificationGateway>,
        config: EngineConfig,
        events: Option<Sender<EngineEvent>>,
        shutdown: CancellationToken,
    ) -> Self {
        let bridge = RealtimeBridge::new(store.clone(), gateway.clone(), &config.meeting_table);
        Self {
            store,
            gateway,
            bridge,
            config,
            current: StdMutex::new(None),
            loading: AtomicBool::new(false),
            transition: Mutex::new(()),
            events,
            shutdown,
        }
    }

    /// Queries the store for a persisted session, once. Never fails: any
    /// store error maps to a signed-out start and is only logged, so the
    /// caller always lands in a usable state.
    pub async fn restore_session(&self) -> Option<Session> {
        match self.store.current_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!("Session restore failed, starting signed out: {}", err);
                None
            }
        }
    }

    /// Restores the persisted session and runs the first transition.
    pub async fn start(&self) {
        self.loading.store(true, Ordering::SeqCst);
        let restored = self.restore_session().await;
        self.on_user_changed(restored).await;
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Reacts to a session transition: previous machinery down, next
    /// machinery up. Guests and signed-out states end in the passive state
    /// with no subscription and no scan binding.
    pub async fn on_user_changed(&self, next: Option<Session>) {
        let _guard = self.transition.lock().await;

        // Previous session's feed goes away before anything new is built
        if self.bridge.close() {
            self.emit(EngineEvent::SubscriptionChanged { live: false })
                .await;
        }

        match next {
            Some(session) => {
                log_session_event("signed in", &session.profile.name);
                {
                    *self.current.lock().unwrap() = Some(session.clone());
                }
                self.emit(EngineEvent::SessionChanged(Some(session.clone())))
                    .await;

                if session.is_guest() {
                    self.gateway.clear_user();
                    info!("Guest session, staying passive");
                    return;
                }

                self.gateway.reset_for_user(session.user_id());

                // Prime scan state from the current collection. A fetch
                // failure must not stop the subscription from opening.
                match self.store.meetings().await {
                    Ok(meetings) => {
                        let now = Utc::now();
                        let reminders = self.gateway.check_reminders(&meetings, now).await;
                        let new_meetings =
                            self.gateway.check_for_new_meetings(&meetings, now).await;
                        self.emit(EngineEvent::ScanCompleted {
                            reminders,
                            new_meetings,
                        })
                        .await;
                    }
                    Err(err) => {
                        warn!("Initial meeting fetch failed: {}", err);
                        self.emit(EngineEvent::Error(format!("meeting fetch failed: {}", err)))
                            .await;
                    }
                }

                match self.bridge.open(&session).await {
                    Ok(()) => {
                        if self.bridge.is_subscribed() {
                            self.emit(EngineEvent::SubscriptionChanged { live: true })
                                .await;
                        }
                    }
                    Err(err) => {
                        warn!("Realtime subscription failed, scan remains the fallback: {}", err);
                        self.emit(EngineEvent::Error(format!(
                            "realtime subscription failed: {}",
                            err
                        )))
                        .await;
                    }
                }
            }
            None => {
                {
                    *self.current.lock().unwrap() = None;
                }
                self.gateway.clear_user();
                self.emit(EngineEvent::SessionChanged(None)).await;
                info!("Signed out, engine passive");
            }
        }
    }

    pub async fn login(&self, session: Session) {
        self.on_user_changed(Some(session)).await;
    }

    /// Signs the current session out. The realtime feed halts immediately;
    /// the store call may fail without leaving the engine signed in.
    pub async fn logout(&self) {
        let previous = { self.current.lock().unwrap().clone() };
        let session = match previous {
            Some(session) => session,
            None => {
                debug!("Logout with no active session");
                return;
            }
        };

        log_session_event("signed out", &session.profile.name);

        // Close this session's feed before any store round trip. Keyed by
        // token so a concurrent sign-in's fresh feed is left alone.
        if self.bridge.close_for(&session.token) {
            self.emit(EngineEvent::SubscriptionChanged { live: false })
                .await;
        }

        if let Err(err) = self.store.logout().await {
            warn!("Store logout failed, clearing local session anyway: {}", err);
            self.emit(EngineEvent::Error(format!("logout failed: {}", err)))
                .await;
        }

        self.on_user_changed(None).await;
    }

    /// Periodic reconciliation loop. Runs until the shutdown token fires.
    pub async fn run(&self) {
        info!("Starting engine loop");

        loop {
            if self.shutdown.is_cancelled() {
                info!("Shutdown signal received, stopping engine loop");
                break;
            }

            if let Err(err) = self.scan_cycle().await {
                error!("Error in scan cycle: {}", err);
                self.emit(EngineEvent::Error(err.to_string())).await;
            }

            tokio::select! {
                _ = sleep(self.config.scan_interval) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received during sleep, stopping engine loop");
                    break;
                }
            }
        }

        // Teardown must not leave a live feed behind
        if self.bridge.close() {
            self.emit(EngineEvent::SubscriptionChanged { live: false })
                .await;
        }

        info!("Engine loop stopped gracefully");
    }

    /// One reconciliation pass for the active user, if any.
    async fn scan_cycle(&self) -> EngineResult<()> {
        let session = { self.current.lock().unwrap().clone() };
        let session = match session {
            Some(session) if !session.is_guest() => session,
            _ => return Ok(()),
        };

        let meetings = self.store.meetings().await?;
        let now = Utc::now();
        let reminders = self.gateway.check_reminders(&meetings, now).await;
        let new_meetings = self.gateway.check_for_new_meetings(&meetings, now).await;

        log_scan_pass(&session.profile.name, reminders, new_meetings);
        self.emit(EngineEvent::ScanCompleted {
            reminders,
            new_meetings,
        })
        .await;

        Ok(())
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    pub fn is_loading_session(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.bridge.is_subscribed()
    }

    async fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
