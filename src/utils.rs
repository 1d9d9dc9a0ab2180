use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Europe::Brussels;

/// Synthesizes the company e-mail address for a user name:
/// `"Jan Janssen"` becomes `jan.janssen@dematic.com`.
pub fn company_email(name: &str) -> String {
    let local: String = name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");
    format!("{}@dematic.com", local)
}

/// Timestamp fields stored on a registration: the RFC 3339 instant, the UTC
/// calendar date and the local Brussels wall-clock time.
pub fn registration_timestamp(now: DateTime<Utc>) -> (String, String, String) {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.with_timezone(&Brussels).format("%H:%M").to_string();
    (timestamp, date, time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn email_lowercases_and_dots_spaces() {
        assert_eq!(company_email("Jan Janssen"), "jan.janssen@dematic.com");
        assert_eq!(
            company_email("  Siegfried   Weverbergh "),
            "siegfried.weverbergh@dematic.com"
        );
    }

    #[test]
    fn timestamp_parts() {
        // 05:41 UTC on a winter date is 06:41 in Brussels.
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 5, 41, 0).unwrap();
        let (timestamp, date, time) = registration_timestamp(now);
        assert_eq!(timestamp, "2025-01-15T05:41:00.000Z");
        assert_eq!(date, "2025-01-15");
        assert_eq!(time, "06:41");
    }
}
