// SPDX-License-Identifier: MIT OR Apache-2.0
//! Build timestamps: ISO rendering and human-readable distances.

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp as ISO-8601 UTC with millisecond precision,
/// e.g. `2014-03-20T12:36:17.080Z`.
pub fn iso_millis(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Describe `at` relative to `now`: `"3 minutes ago"`, `"in an hour"`.
///
/// Thresholds follow the usual calendar-ish rounding: under 45 seconds is
/// "a few seconds", under 45 minutes counts minutes, under 22 hours counts
/// hours, under 26 days counts days, under 320 days counts months.
pub fn describe_distance(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at);
    let seconds = delta.num_seconds().unsigned_abs();
    let phrase = humanize(seconds);
    if delta.num_milliseconds() >= 0 {
        format!("{phrase} ago")
    } else {
        format!("in {phrase}")
    }
}

fn humanize(seconds: u64) -> String {
    let secs = seconds as f64;
    let minutes = (secs / 60.0).round() as u64;
    let hours = (secs / 3_600.0).round() as u64;
    let days = (secs / 86_400.0).round() as u64;

    match seconds {
        0..45 => "a few seconds".to_string(),
        45..90 => "a minute".to_string(),
        _ if minutes < 45 => format!("{minutes} minutes"),
        _ if minutes < 90 => "an hour".to_string(),
        _ if hours < 22 => format!("{hours} hours"),
        _ if hours < 36 => "a day".to_string(),
        _ if days < 26 => format!("{days} days"),
        _ if days < 45 => "a month".to_string(),
        _ if days < 320 => format!("{} months", ((days as f64) / 30.0).round() as u64),
        _ if days < 548 => "a year".to_string(),
        _ => format!("{} years", ((days as f64) / 365.0).round() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn iso_rendering_keeps_millis() {
        let at = DateTime::from_timestamp_millis(1_395_318_977_080).unwrap();
        assert_eq!(iso_millis(at), "2014-03-20T12:36:17.080Z");
    }

    #[test]
    fn past_distances() {
        let now = base();
        let cases = [
            (Duration::seconds(10), "a few seconds ago"),
            (Duration::seconds(60), "a minute ago"),
            (Duration::minutes(5), "5 minutes ago"),
            (Duration::minutes(60), "an hour ago"),
            (Duration::hours(3), "3 hours ago"),
            (Duration::hours(30), "a day ago"),
            (Duration::days(4), "4 days ago"),
            (Duration::days(30), "a month ago"),
            (Duration::days(90), "3 months ago"),
            (Duration::days(400), "a year ago"),
            (Duration::days(365 * 10), "10 years ago"),
        ];
        for (delta, expected) in cases {
            assert_eq!(describe_distance(now - delta, now), expected, "{delta}");
        }
    }

    #[test]
    fn future_distance() {
        let now = base();
        assert_eq!(describe_distance(now + Duration::minutes(2), now), "in 2 minutes");
    }
}
