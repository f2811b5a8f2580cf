//! Engine configuration.
//!
//! Defaults are chosen for a desktop notifier: an hour of reminder lead time,
//! a short look-back so reminders that just missed a cycle still fire, and a
//! 30-second reconciliation pace. All knobs accept environment overrides so
//! the daemon can be tuned without a config file.

use std::env;
use std::time::Duration;

use log::info;

use crate::error::{EngineError, EngineResult};

/// Upper bound for the window knobs, one year in minutes. Values beyond
/// this overflow chrono's date arithmetic once a scan pass runs.
const MAX_WINDOW_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How far ahead of a meeting's start a reminder may fire, in minutes.
    pub lead_time_minutes: i64,
    /// How far behind "now" a meeting may be and still get a late reminder.
    pub look_back_minutes: i64,
    /// Pace of the periodic reminder reconciliation pass.
    pub scan_interval: Duration,
    /// Store collection the realtime bridge subscribes to.
    pub meeting_table: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lead_time_minutes: 60,
            look_back_minutes: 5,
            scan_interval: Duration::from_secs(30),
            meeting_table: "meetings".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lead_time_minutes: env_i64("MEETCHIME_LEAD_MINUTES", defaults.lead_time_minutes),
            look_back_minutes: env_i64("MEETCHIME_LOOK_BACK_MINUTES", defaults.look_back_minutes),
            scan_interval: Duration::from_secs(env_u64(
                "MEETCHIME_SCAN_SECONDS",
                defaults.scan_interval.as_secs(),
            )),
            meeting_table: env::var("MEETCHIME_MEETING_TABLE")
                .unwrap_or(defaults.meeting_table),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.lead_time_minutes <= 0 {
            return Err(EngineError::config("reminder lead time must be positive"));
        }
        if self.lead_time_minutes > MAX_WINDOW_MINUTES {
            return Err(EngineError::config("reminder lead time must be at most a year"));
        }
        if self.look_back_minutes < 0 {
            return Err(EngineError::config("look back must not be negative"));
        }
        if self.look_back_minutes > MAX_WINDOW_MINUTES {
            return Err(EngineError::config("look back must be at most a year"));
        }
        if self.scan_interval.is_zero() {
            return Err(EngineError::config("scan interval must be positive"));
        }
        if self.meeting_table.is_empty() {
            return Err(EngineError::config("meeting table name must not be empty"));
        }

        info!(
            "Engine config: lead {}m, look back {}m, scan every {:?}",
            self.lead_time_minutes, self.look_back_minutes, self.scan_interval
        );
        Ok(())
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lead_time_minutes, 60);
        assert_eq!(config.meeting_table, "meetings");
    }

    #[test]
    fn test_rejects_zero_lead_time() {
        let config = EngineConfig {
            lead_time_minutes: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_windows() {
        let config = EngineConfig {
            lead_time_minutes: i64::MAX,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            look_back_minutes: MAX_WINDOW_MINUTES + 1,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_accepts_year_long_lead() {
        let config = EngineConfig {
            lead_time_minutes: MAX_WINDOW_MINUTES,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_table() {
        let config = EngineConfig {
            meeting_table: String::new(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_override() {
        std::env::set_var("MEETCHIME_LEAD_MINUTES", "15");
        std::env::set_var("MEETCHIME_SCAN_SECONDS", "5");

        let config = EngineConfig::from_env();
        assert_eq!(config.lead_time_minutes, 15);
        assert_eq!(config.scan_interval, Duration::from_secs(5));

        std::env::remove_var("MEETCHIME_LEAD_MINUTES");
        std::env::remove_var("MEETCHIME_SCAN_SECONDS");
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_garbage() {
        std::env::set_var("MEETCHIME_LEAD_MINUTES", "not-a-number");

        let config = EngineConfig::from_env();
        assert_eq!(config.lead_time_minutes, 60);

        std::env::remove_var("MEETCHIME_LEAD_MINUTES");
    }
}
