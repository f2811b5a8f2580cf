use crate::models::{Meeting, Session};

/// Engine-to-consumer event stream.
///
/// Everything observable about the engine flows through this enum; consumers
/// (the daemon's log drain, tests, an eventual UI) receive it over an mpsc
/// channel. Events are best-effort: if no consumer is attached or the
/// receiver is gone, the engine drops them and keeps going.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ===== Session Lifecycle =====
    /// The active session changed. `None` means signed out. Guest sessions
    /// arrive as `Some` but carry no reminders or realtime feed, so
    /// consumers should treat them as unauthenticated too.
    SessionChanged(Option<Session>),
    /// The realtime insert subscription was opened (`true`) or closed.
    SubscriptionChanged { live: bool },

    // ===== Notifications =====
    /// A reminder fired for an upcoming meeting.
    ReminderFired(Meeting),
    /// A meeting was announced, either from the realtime feed or from the
    /// periodic diff fallback.
    MeetingDiscovered { meeting: Meeting, via_realtime: bool },

    // ===== Periodic Scan =====
    /// One reconciliation pass finished.
    ScanCompleted { reminders: usize, new_meetings: usize },

    // ===== Failures =====
    /// A non-fatal failure the engine absorbed.
    Error(String),
}
