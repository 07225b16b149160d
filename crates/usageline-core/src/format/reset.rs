//! Calendar-aware reset annotations: `" (2h 10m - 3:30pm)"`, `" (1.9d - tmrw)"`.
//!
//! Both the reset instant and "now" are projected into one fixed civil
//! offset (the billing day boundary), never the host's local zone.

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::duration::format_duration;

/// Failure to interpret a `resets_at` value
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("empty reset timestamp")]
    Empty,

    #[error("reset timestamp is not a string: {0}")]
    NotAString(Value),

    #[error("invalid reset timestamp {value:?}: {source}")]
    Invalid {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Format the reset annotation for a window.
///
/// Returns an empty string when there is no reset instant (absent or
/// `null`) or it cannot be parsed, so the window still renders with its
/// utilization alone.
pub fn format_reset(resets_at: Option<&Value>, now: DateTime<Utc>, tz: FixedOffset) -> String {
    let Some(resets_at) = resets_at.filter(|v| !v.is_null()) else {
        return String::new();
    };
    match try_format_reset(resets_at, now, tz) {
        Ok(annotation) => annotation,
        Err(e) => {
            debug!("Omitting reset annotation: {}", e);
            String::new()
        }
    }
}

/// Fallible form of [`format_reset`]
pub fn try_format_reset(
    resets_at: &Value,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Result<String, TimestampError> {
    let text = resets_at
        .as_str()
        .ok_or_else(|| TimestampError::NotAString(resets_at.clone()))?;
    let reset = parse_reset(text)?.with_timezone(&tz);
    let now = now.with_timezone(&tz);

    let (remaining, label) = if reset > now {
        let remaining = reset - now;
        (remaining, format_duration(remaining))
    } else {
        (TimeDelta::zero(), "now".to_string())
    };
    let show_clock = remaining <= TimeDelta::days(1);
    let clock = clock_label(&reset);

    let today = now.date_naive();
    let reset_day = reset.date_naive();
    let when = if reset_day == today {
        clock
    } else if today.succ_opt() == Some(reset_day) {
        if show_clock {
            format!("tmrw {}", clock)
        } else {
            "tmrw".to_string()
        }
    } else {
        let date = format!(
            "{}/{}",
            strip_leading_zero(&reset.format("%m").to_string()),
            strip_leading_zero(&reset.format("%d").to_string()),
        );
        if show_clock {
            format!("{} {}", date, clock)
        } else {
            date
        }
    };

    Ok(format!(" ({} - {})", label, when))
}

fn parse_reset(value: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TimestampError::Empty);
    }
    DateTime::parse_from_rfc3339(value).map_err(|source| TimestampError::Invalid {
        value: value.to_string(),
        source,
    })
}

/// 12-hour clock without leading zero, `:00` dropped on the hour: `"3pm"`, `"9:05am"`
fn clock_label(at: &DateTime<FixedOffset>) -> String {
    let pattern = if at.minute() == 0 { "%I%P" } else { "%I:%M%P" };
    strip_leading_zero(&at.format(pattern).to_string()).to_string()
}

/// `"03"` -> `"3"`, `"09:05am"` -> `"9:05am"`; a lone `"0"` is kept
fn strip_leading_zero(s: &str) -> &str {
    match s.strip_prefix('0') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => s,
    }
}
