use chrono::{DateTime, NaiveDate, Utc};

pub mod logging;

/// Day bucket used for notification dedup: one calendar day (UTC) per key.
pub fn day_bucket(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Short date form used in notification bodies, e.g. "5/1/2024".
pub fn format_meeting_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

/// Clock form used in reminder bodies, e.g. "14:30".
pub fn format_meeting_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

/// Truncates notification body text to a displayable first line.
pub fn truncate_body(text: &str, max_len: usize) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_meeting_date_no_padding() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(format_meeting_date(at), "5/1/2024");

        let at = Utc.with_ymd_and_hms(2024, 11, 23, 9, 0, 0).unwrap();
        assert_eq!(format_meeting_date(at), "11/23/2024");
    }

    #[test]
    fn test_format_meeting_time() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
        assert_eq!(format_meeting_time(at), "14:30");
    }

    #[test]
    fn test_day_bucket_strips_time() {
        let morning = Utc.with_ymd_and_hms(2024, 5, 1, 0, 5, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 5, 1, 23, 55, 0).unwrap();
        assert_eq!(day_bucket(morning), day_bucket(evening));

        let next_day = Utc.with_ymd_and_hms(2024, 5, 2, 0, 5, 0).unwrap();
        assert_ne!(day_bucket(morning), day_bucket(next_day));
    }

    #[test]
    fn test_truncate_body_respects_max_length() {
        let long_text = "a".repeat(100);
        let truncated = truncate_body(&long_text, 80);
        assert!(truncated.chars().count() <= 80);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_body_takes_first_line() {
        let multiline = "first line\nsecond line";
        assert_eq!(truncate_body(multiline, 80), "first line");
    }
}
