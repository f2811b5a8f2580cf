//! Realtime insert subscription lifecycle.
//!
//! The bridge owns at most one live subscription to the store's insert feed.
//! Each subscription is tagged with the session that opened it, so a close
//! issued on behalf of an already-replaced session cannot tear down the
//! newer session's feed. Closing is fire-and-forget: local state drops
//! immediately and the consumer task winds down on its cancel token.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::models::Session;
use crate::notify::NotificationGateway;
use crate::store::{MeetingStore, SubscriptionId};

/// One live subscription: the session that opened it, the store-issued id,
/// and the consumer task's cancel token.
struct BridgeHandle {
    session_token: String,
    subscription: SubscriptionId,
    cancel: CancellationToken,
}

pub struct RealtimeBridge {
    store: Arc<dyn MeetingStore>,
    gateway: Arc<NotificationGateway>,
    table: String,
    active: Mutex<Option<BridgeHandle>>,
}

impl RealtimeBridge {
    pub fn new(
        store: Arc<dyn MeetingStore>,
        gateway: Arc<NotificationGateway>,
        table: &str,
    ) -> Self {
        Self {
            store,
            gateway,
            table: table.to_string(),
            active: Mutex::new(None),
        }
    }

    /// Opens the insert feed for the session, tearing down any previous
    /// subscription first. Guest sessions never subscribe.
    pub async fn open(&self, session: &Session) -> EngineResult<()> {
        self.close();

        if session.is_guest() {
            debug!("Guest session, skipping realtime subscription");
            return Ok(());
        }

        let feed = self.store.subscribe_inserts(&self.table).await?;
        let cancel = CancellationToken::new();

        let gateway = self.gateway.clone();
        let worker_cancel = cancel.clone();
        let mut events = feed.events;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_cancel.cancelled() => {
                        debug!("Insert feed consumer cancelled");
                        break;
                    }
                    maybe = events.recv() => {
                        match maybe {
                            Some(meeting) => {
                                info!("Realtime insert: '{}'", meeting.title);
                                gateway.announce_meeting(&meeting, Utc::now(), true).await;
                            }
                            None => {
                                warn!("Insert feed closed by store");
                                break;
                            }
                        }
                    }
                }
            }
        });

        let handle = BridgeHandle {
            session_token: session.token.clone(),
            subscription: feed.id,
            cancel,
        };

        let mut active = self.active.lock().unwrap();
        if let Some(previous) = active.take() {
            self.shutdown(previous);
        }
        *active = Some(handle);
        info!(
            "Realtime subscription opened for {}",
            session.profile.name
        );

        Ok(())
    }

    /// Closes whatever subscription is live. Returns whether anything was
    /// closed.
    pub fn close(&self) -> bool {
        let taken = self.active.lock().unwrap().take();
        match taken {
            Some(handle) => {
                self.shutdown(handle);
                true
            }
            None => false,
        }
    }

    /// Closes the subscription only if it still belongs to the given
    /// session; a close racing a newer session's setup is ignored. Returns
    /// whether anything was closed.
    pub fn close_for(&self, session_token: &str) -> bool {
        let mut active = self.active.lock().unwrap();
        let owned = active
            .as_ref()
            .map(|handle| handle.session_token == session_token)
            .unwrap_or(false);

        if owned {
            if let Some(handle) = active.take() {
                self.shutdown(handle);
            }
            true
        } else {
            if active.is_some() {
                debug!("Ignoring close for replaced session");
            }
            false
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Token of the session holding the live subscription, if any.
    pub fn subscribed_session(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap()
            .as_ref()
            .map(|handle| handle.session_token.clone())
    }

    fn shutdown(&self, handle: BridgeHandle) {
        handle.cancel.cancel();
        self.store.unsubscribe(handle.subscription);
        info!("Realtime subscription closed");
    }
}
