//! Periodic reconciliation over the meeting collection.
//!
//! The scanner answers two questions on every pass: which meetings are close
//! enough to their start time to deserve a reminder, and which meetings have
//! appeared since the last pass. It is a fallback for the realtime feed, so
//! all of its dedup state is shared with the realtime path through the
//! [`NotificationLedger`].

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::config::EngineConfig;
use crate::models::Meeting;
use crate::notify::NotificationLedger;
use crate::utils::day_bucket;

/// Reminder window around a meeting's start time.
#[derive(Debug, Clone, Copy)]
pub struct ReminderPolicy {
    /// How far before the start a reminder may fire.
    pub lead_time: Duration,
    /// How far after the start a reminder may still fire, so a pass that
    /// lands just after the start does not go silent.
    pub look_back: Duration,
}

impl ReminderPolicy {
    pub fn new(lead_time_minutes: i64, look_back_minutes: i64) -> Self {
        Self {
            lead_time: Duration::minutes(lead_time_minutes),
            look_back: Duration::minutes(look_back_minutes),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.lead_time_minutes, config.look_back_minutes)
    }

    /// Whether `starts_at` falls inside `[now - look_back, now + lead_time]`.
    pub fn window_contains(&self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
        starts_at >= now - self.look_back && starts_at <= now + self.lead_time
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub reminders: Vec<Meeting>,
    pub new_meetings: Vec<Meeting>,
}

/// Stateful scanner bound to the signed-in user.
///
/// Holds the set of meeting ids seen in earlier passes so arrivals can be
/// diffed, plus a primed flag so the first pass after a session change
/// absorbs the existing collection without announcing all of it.
pub struct ReminderScanner {
    policy: ReminderPolicy,
    user_id: Option<String>,
    observed: HashSet<String>,
    primed: bool,
}

impl ReminderScanner {
    pub fn new(policy: ReminderPolicy) -> Self {
        Self {
            policy,
            user_id: None,
            observed: HashSet::new(),
            primed: false,
        }
    }

    /// Rebinds the scanner to a user, discarding all per-user scan state.
    pub fn reset_for(&mut self, user_id: &str) {
        self.user_id = Some(user_id.to_string());
        self.observed.clear();
        self.primed = false;
    }

    /// Unbinds the scanner; passes become no-ops until the next user.
    pub fn clear(&mut self) {
        self.user_id = None;
        self.observed.clear();
        self.primed = false;
    }

    /// One full pass: reminders and arrivals in a single sweep.
    pub fn scan(
        &mut self,
        meetings: &[Meeting],
        now: DateTime<Utc>,
        ledger: &mut NotificationLedger,
    ) -> ScanOutcome {
        ScanOutcome {
            reminders: self.scan_reminders(meetings, now, ledger),
            new_meetings: self.diff_new(meetings, now, ledger),
        }
    }

    /// Collects meetings inside the reminder window that have not been
    /// announced today. Marks the ledger as it collects, so a meeting
    /// returned here is never returned again on a later pass the same day.
    pub fn scan_reminders(
        &mut self,
        meetings: &[Meeting],
        now: DateTime<Utc>,
        ledger: &mut NotificationLedger,
    ) -> Vec<Meeting> {
        let user_id = match &self.user_id {
            Some(id) => id.clone(),
            None => return Vec::new(),
        };
        let today = day_bucket(now);

        let mut due = Vec::new();
        for meeting in meetings {
            if !meeting.involves(&user_id) {
                continue;
            }
            if !self.policy.window_contains(now, meeting.starts_at) {
                continue;
            }
            if ledger.mark(&meeting.id, today) {
                debug!("Reminder due for '{}' ({})", meeting.title, meeting.id);
                due.push(meeting.clone());
            }
        }
        due
    }

    /// Marks a meeting as already seen, so later diffs skip it. Used when
    /// the realtime path surfaces a meeting before any scan has.
    pub fn observe(&mut self, meeting_id: &str) {
        self.observed.insert(meeting_id.to_string());
    }

    /// Diffs the collection against earlier passes and returns the arrivals.
    ///
    /// The first pass after `reset_for` only primes the observed set; a
    /// freshly signed-in user is not greeted with their whole calendar.
    /// Meetings already in today's ledger bucket are absorbed silently, so
    /// a pass never reports a meeting it just reminded about.
    pub fn diff_new(
        &mut self,
        meetings: &[Meeting],
        now: DateTime<Utc>,
        ledger: &NotificationLedger,
    ) -> Vec<Meeting> {
        let user_id = match &self.user_id {
            Some(id) => id.clone(),
            None => return Vec::new(),
        };
        let today = day_bucket(now);

        let mut arrivals = Vec::new();
        for meeting in meetings {
            if !meeting.involves(&user_id) {
                continue;
            }
            if self.observed.insert(meeting.id.clone())
                && self.primed
                && !ledger.contains(&meeting.id, today)
            {
                arrivals.push(meeting.clone());
            }
        }

        self.primed = true;
        arrivals
    }
}
