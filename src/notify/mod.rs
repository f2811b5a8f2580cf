//! Notification pipeline: permission gate, dedup ledger, and scan entry
//! points, in front of a pluggable delivery sink.
//!
//! The gateway is the only component that talks to the sink. Both delivery
//! paths converge here: the realtime bridge announces inserts as they
//! arrive, and the periodic scan announces reminders and anything the feed
//! missed. A shared ledger keyed by (meeting, day) keeps the two paths from
//! double-announcing, and no failure below this layer escapes it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::mpsc::Sender;

use crate::messages::EngineEvent;
use crate::models::Meeting;
use crate::scanner::{ReminderPolicy, ReminderScanner};
use crate::utils::{day_bucket, format_meeting_date, format_meeting_time};

pub mod ledger;
pub mod sink;

pub use ledger::NotificationLedger;
pub use sink::{NotificationSink, PermissionStatus, TerminalSink};

/// Scan and dedup state behind one lock; the two are always updated
/// together, so a single guard keeps them coherent.
struct GatewayState {
    ledger: NotificationLedger,
    scanner: ReminderScanner,
}

pub struct NotificationGateway {
    sink: Arc<dyn NotificationSink>,
    state: Mutex<GatewayState>,
    events: Option<Sender<EngineEvent>>,
}

impl NotificationGateway {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        policy: ReminderPolicy,
        events: Option<Sender<EngineEvent>>,
    ) -> Self {
        Self {
            sink,
            state: Mutex::new(GatewayState {
                ledger: NotificationLedger::new(),
                scanner: ReminderScanner::new(policy),
            }),
            events,
        }
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.sink.permission_status()
    }

    /// Rebinds the scan state to a user. The dedup ledger survives user
    /// switches on purpose: this device already announced those meetings
    /// today, whoever was signed in.
    pub fn reset_for_user(&self, user_id: &str) {
        self.state.lock().unwrap().scanner.reset_for(user_id);
    }

    /// Unbinds the scan state; scans become no-ops until the next user.
    pub fn clear_user(&self) {
        self.state.lock().unwrap().scanner.clear();
    }

    /// Composes nothing, decides nothing: delivers the given text if the
    /// platform permits, and swallows delivery failures.
    pub async fn send_notification(&self, title: &str, body: &str) {
        if !self.sink.permission_status().allows_delivery() {
            debug!("Notifications not permitted, dropping '{}'", title);
            return;
        }
        if let Err(err) = self.sink.deliver(title, body) {
            warn!("Notification delivery failed: {}", err);
            self.emit(EngineEvent::Error(format!(
                "notification delivery failed: {}",
                err
            )))
            .await;
        }
    }

    /// At-most-once guard plus permission gate for a "new meeting" notice.
    /// Returns true when a notification was actually dispatched.
    ///
    /// The ledger is marked before the permission check: a dropped delivery
    /// counts as attempted and is never retried.
    pub async fn notify_if_permitted(&self, meeting: &Meeting, now: DateTime<Utc>) -> bool {
        let fresh = self
            .state
            .lock()
            .unwrap()
            .ledger
            .mark(&meeting.id, day_bucket(now));
        if !fresh {
            debug!("Already announced '{}' today, skipping", meeting.title);
            return false;
        }

        if !self.sink.permission_status().allows_delivery() {
            return false;
        }

        let body = format!(
            "{} on {}",
            meeting.title,
            format_meeting_date(meeting.starts_at)
        );
        self.send_notification("New meeting", &body).await;
        true
    }

    /// Surfaces a meeting to consumers and notifies if permitted. Used by
    /// the realtime bridge for live inserts and by the periodic diff for
    /// anything the feed missed.
    pub async fn announce_meeting(&self, meeting: &Meeting, now: DateTime<Utc>, via_realtime: bool) {
        if via_realtime {
            // The next diff pass must not rediscover this meeting
            self.state.lock().unwrap().scanner.observe(&meeting.id);
        }

        self.emit(EngineEvent::MeetingDiscovered {
            meeting: meeting.clone(),
            via_realtime,
        })
        .await;
        self.notify_if_permitted(meeting, now).await;
    }

    /// Reminder half of a scan pass: fires a notice for every involved
    /// meeting whose start falls in the reminder window, at most once per
    /// meeting per day. Returns how many fired.
    pub async fn check_reminders(&self, meetings: &[Meeting], now: DateTime<Utc>) -> usize {
        let due = {
            let mut guard = self.state.lock().unwrap();
            let GatewayState { ledger, scanner } = &mut *guard;
            scanner.scan_reminders(meetings, now, ledger)
        };

        for meeting in &due {
            let body = format!(
                "{} starts at {}",
                meeting.title,
                format_meeting_time(meeting.starts_at)
            );
            self.send_notification("Meeting reminder", &body).await;
            self.emit(EngineEvent::ReminderFired(meeting.clone())).await;
        }
        due.len()
    }

    /// Arrival half of a scan pass: diffs the collection against what
    /// earlier passes saw and announces the new ones, skipping anything
    /// already in today's ledger. Returns how many arrivals were found.
    pub async fn check_for_new_meetings(&self, meetings: &[Meeting], now: DateTime<Utc>) -> usize {
        let arrivals = {
            let mut guard = self.state.lock().unwrap();
            let GatewayState { ledger, scanner } = &mut *guard;
            scanner.diff_new(meetings, now, ledger)
        };

        for meeting in &arrivals {
            self.announce_meeting(meeting, now, false).await;
        }
        arrivals.len()
    }

    async fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
