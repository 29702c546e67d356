//! Reminder time parsing and display helpers
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Wall-clock, calendar and RFC 3339 forms alongside relative durations
//! - 1.0.0: Relative duration parsing and formatting

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("unrecognized time '{0}'")]
    Unrecognized(String),
}

static MERIDIEM_RE: OnceLock<Regex> = OnceLock::new();

fn meridiem_regex() -> &'static Regex {
    MERIDIEM_RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm)$").expect("meridiem pattern is a valid literal")
    })
}

/// Resolve a reminder time expression into an instant.
///
/// Accepts `HH:MM` / `7pm` / `7:30am` (next occurrence at or after `now` in
/// `offset`), `YYYY-MM-DD HH:MM`, RFC 3339, and relative durations such as
/// `30m`, `1h30m` or `in 2h`.
pub fn resolve_time(
    input: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, TimeParseError> {
    let raw = input.trim();
    let lowered = raw.to_lowercase();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_to_utc(naive, offset, raw);
        }
    }

    if let Some(time) = parse_wall_clock(&lowered) {
        return Ok(next_occurrence(time, now, offset));
    }

    let relative = lowered.strip_prefix("in ").unwrap_or(&lowered);
    if let Some(seconds) = parse_duration(relative) {
        return Duration::try_seconds(seconds)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| TimeParseError::Unrecognized(raw.to_string()));
    }

    Err(TimeParseError::Unrecognized(raw.to_string()))
}

fn local_to_utc(
    naive: NaiveDateTime,
    offset: FixedOffset,
    raw: &str,
) -> Result<DateTime<Utc>, TimeParseError> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::Unrecognized(raw.to_string()))
}

fn parse_wall_clock(s: &str) -> Option<NaiveTime> {
    for format in ["%H:%M", "%H:%M:%S"] {
        if let Ok(time) = NaiveTime::parse_from_str(s, format) {
            return Some(time);
        }
    }

    let caps = meridiem_regex().captures(s)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, caps.get(3)?.as_str()) {
        (12, "am") => 0,
        (12, "pm") => 12,
        (h, "pm") => h + 12,
        (h, _) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// First instant at or after `now` whose wall-clock time in `offset` is `time`
pub fn next_occurrence(time: NaiveTime, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive().and_time(time);
    // FixedOffset never has gaps or folds
    let candidate = match offset.from_local_datetime(&today).single() {
        Some(dt) => dt.with_timezone(&Utc),
        None => return now,
    };

    if candidate < now {
        candidate.checked_add_signed(Duration::days(1)).unwrap_or(candidate)
    } else {
        candidate
    }
}

/// Parse a time duration string like "30m", "2h", "1d", "1h30m" into seconds
pub fn parse_duration(time_str: &str) -> Option<i64> {
    let time_str = time_str.trim().to_lowercase();
    let mut total_seconds: i64 = 0;
    let mut current_number = String::new();

    for c in time_str.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if c.is_whitespace() {
            continue;
        } else if !current_number.is_empty() {
            let value: i64 = current_number.parse().ok()?;
            current_number.clear();

            let unit: i64 = match c {
                's' => 1,
                'm' => 60,
                'h' => 60 * 60,
                'd' => 60 * 60 * 24,
                'w' => 60 * 60 * 24 * 7,
                _ => return None,
            };
            total_seconds = total_seconds.checked_add(value.checked_mul(unit)?)?;
        } else {
            return None;
        }
    }

    // Trailing digits without a unit
    if !current_number.is_empty() {
        return None;
    }

    if total_seconds > 0 {
        Some(total_seconds)
    } else {
        None
    }
}

/// Format a duration in seconds into a human-readable string
pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{} second{}", seconds, if seconds == 1 { "" } else { "s" })
    } else if seconds < 3600 {
        let mins = seconds / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!(
                "{} hour{} {} minute{}",
                hours,
                if hours == 1 { "" } else { "s" },
                mins,
                if mins == 1 { "" } else { "s" }
            )
        } else {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!(
                "{} day{} {} hour{}",
                days,
                if days == 1 { "" } else { "s" },
                hours,
                if hours == 1 { "" } else { "s" }
            )
        } else {
            format!("{} day{}", days, if days == 1 { "" } else { "s" })
        }
    }
}

/// "in 5 minutes" / "any moment now" relative to `now`
pub fn describe_until(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = at.signed_duration_since(now).num_seconds();
    if diff > 0 {
        format!("in {}", format_duration(diff))
    } else {
        "any moment now".to_string()
    }
}
