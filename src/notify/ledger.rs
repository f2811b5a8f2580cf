//! At-most-once bookkeeping for meeting notifications.

use std::collections::HashSet;

use chrono::NaiveDate;

/// Remembers which (meeting, day) pairs have already been announced.
///
/// Both delivery paths consult the same ledger, so a meeting announced by the
/// realtime feed stays quiet on the next periodic scan and vice versa. Keyed
/// by calendar day, so a meeting can be announced again on a later day.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    sent: HashSet<(String, NaiveDate)>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pair. Returns true when it was not already present, i.e.
    /// the caller holds the one dispatch slot for this meeting today.
    pub fn mark(&mut self, meeting_id: &str, day: NaiveDate) -> bool {
        self.sent.insert((meeting_id.to_string(), day))
    }

    pub fn contains(&self, meeting_id: &str, day: NaiveDate) -> bool {
        self.sent.contains(&(meeting_id.to_string(), day))
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}
