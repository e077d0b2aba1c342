//! Presentation-time timestamp formatting.
//!
//! Mirrors the copy used across the product ("moments ago", "3 mins ago").
//! Both helpers are tolerant of missing input and return `None` rather than
//! erroring.

use chrono::{DateTime, Utc};

/// Render the distance between `timestamp` and `now` as relative copy.
///
/// Timestamps in the future are clamped to "moments ago".
pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - timestamp).max(chrono::Duration::zero());

    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "moments ago".to_string()
    } else if hours < 1 {
        format!("{minutes} min{} ago", plural(minutes))
    } else if days < 1 {
        format!("{hours} hr{} ago", plural(hours))
    } else {
        format!("{days} day{} ago", plural(days))
    }
}

/// Parse an RFC 3339 timestamp and render it relative to now.
pub fn format_relative_time_str(raw: Option<&str>) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw?).ok()?.with_timezone(&Utc);
    Some(format_relative_time(parsed, Utc::now()))
}

/// Absolute display form, e.g. `Mar 1, 2026 10:05`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%b %-d, %Y %H:%M").to_string()
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let cases = [
            (now - chrono::Duration::seconds(30), "moments ago"),
            (now - chrono::Duration::minutes(1), "1 min ago"),
            (now - chrono::Duration::minutes(5), "5 mins ago"),
            (now - chrono::Duration::hours(1), "1 hr ago"),
            (now - chrono::Duration::hours(23), "23 hrs ago"),
            (now - chrono::Duration::days(1), "1 day ago"),
            (now - chrono::Duration::days(12), "12 days ago"),
        ];
        for (timestamp, expected) in cases {
            assert_eq!(format_relative_time(timestamp, now), expected);
        }
    }

    #[test]
    fn future_timestamps_clamp_to_moments_ago() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let future = now + chrono::Duration::hours(2);
        assert_eq!(format_relative_time(future, now), "moments ago");
    }

    #[test]
    fn unparseable_input_yields_none() {
        assert!(format_relative_time_str(None).is_none());
        assert!(format_relative_time_str(Some("yesterday-ish")).is_none());
        assert!(format_relative_time_str(Some("2026-03-01T10:00:00Z")).is_some());
    }

    #[test]
    fn absolute_timestamp_format() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap();
        assert_eq!(format_timestamp(t), "Mar 1, 2026 10:05");
    }
}
