//! Delivery backends for user-facing notifications.
//!
//! The engine composes notification text and hands it to a
//! [`NotificationSink`]; the sink decides whether the platform permits
//! delivery and how to surface it. The default sink emits terminal escape
//! codes (BEL, OSC 9, OSC 777, OSC 99) so notifications work over SSH and in
//! plain terminal sessions without a desktop notification daemon.

use std::env;
use std::io::{self, Write};

use crate::error::EngineResult;
use crate::utils::truncate_body;

/// Maximum body length forwarded to the terminal, in characters.
const MAX_BODY_LEN: usize = 120;

/// Platform permission state for delivering notifications.
///
/// `Default` means the user has not decided yet; deliveries are skipped until
/// permission is explicitly granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Default,
}

impl PermissionStatus {
    pub fn allows_delivery(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Leaf delivery capability. Implementations must not block for long; the
/// engine calls `deliver` from async context and absorbs any error.
pub trait NotificationSink: Send + Sync {
    fn permission_status(&self) -> PermissionStatus;

    fn deliver(&self, title: &str, body: &str) -> EngineResult<()>;
}

/// Terminal escape-code sink.
///
/// Writes multiple sequences so the common emulators all pick one up:
/// BEL (universal bell), OSC 9 (iTerm2), OSC 777 (Konsole/VTE), OSC 99
/// (kitty). Write errors are ignored; a detached stdout is not worth
/// failing a notification over.
pub struct TerminalSink {
    permission: PermissionStatus,
}

impl TerminalSink {
    /// Permission comes from `MEETCHIME_NOTIFICATIONS`: `off`, `0` or
    /// `false` denies, anything else (or unset) grants.
    pub fn new() -> Self {
        let permission = match env::var("MEETCHIME_NOTIFICATIONS").as_deref() {
            Ok("off") | Ok("0") | Ok("false") => PermissionStatus::Denied,
            _ => PermissionStatus::Granted,
        };
        Self { permission }
    }

    pub fn with_permission(permission: PermissionStatus) -> Self {
        Self { permission }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for TerminalSink {
    fn permission_status(&self) -> PermissionStatus {
        self.permission
    }

    fn deliver(&self, title: &str, body: &str) -> EngineResult<()> {
        let message = truncate_body(body, MAX_BODY_LEN);
        let mut stdout = io::stdout();

        let _ = stdout.write_all(b"\x07");

        // OSC 9: ESC ] 9 ; message BEL
        let osc9 = format!("\x1b]9;{}\x07", escape_osc(&message));
        let _ = stdout.write_all(osc9.as_bytes());

        // OSC 777: ESC ] 777 ; notify ; title ; message BEL
        let osc777 = format!(
            "\x1b]777;notify;{};{}\x07",
            escape_osc(title),
            escape_osc(&message)
        );
        let _ = stdout.write_all(osc777.as_bytes());

        // OSC 99: title and body as separate payloads, terminated by ST
        let osc99 = format!(
            "\x1b]99;i=1:d=0:p=title;{}\x1b\\\x1b]99;i=1:d=0:p=body;{}\x1b\\",
            escape_osc(title),
            escape_osc(&message)
        );
        let _ = stdout.write_all(osc99.as_bytes());

        let _ = stdout.flush();
        Ok(())
    }
}

/// OSC sequences end at BEL or ST, so those bytes cannot appear in payloads.
fn escape_osc(s: &str) -> String {
    s.replace('\x07', "")
        .replace('\x1b', "")
        .replace('\n', " ")
        .replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_osc_strips_terminators() {
        assert_eq!(escape_osc("hello\x07world"), "helloworld");
        assert_eq!(escape_osc("test\x1b[0m"), "test[0m");
        assert_eq!(escape_osc("line1\nline2"), "line1 line2");
    }

    #[test]
    fn test_permission_gate() {
        assert!(PermissionStatus::Granted.allows_delivery());
        assert!(!PermissionStatus::Denied.allows_delivery());
        assert!(!PermissionStatus::Default.allows_delivery());
    }

    #[test]
    fn test_with_permission_overrides() {
        let sink = TerminalSink::with_permission(PermissionStatus::Denied);
        assert_eq!(sink.permission_status(), PermissionStatus::Denied);
        // Delivery itself never errors even when unused
        assert!(sink.deliver("title", "body").is_ok());
    }
}
