//! Short human-readable duration formatting: `"45min"`, `"2h 10m"`, `"3.2d"`.

use chrono::TimeDelta;

const MINUTES_PER_DAY: f64 = 1440.0;

/// Format a time span for the status line.
///
/// Negative spans are clamped to zero. Below an hour only minutes are shown,
/// below a day hours plus the minute remainder, and beyond that fractional
/// days with one decimal (a trailing `.0` is dropped).
pub fn format_duration(span: TimeDelta) -> String {
    let total_secs = span.num_seconds().max(0);
    let total_min = total_secs / 60;
    if total_min < 60 {
        return format!("{}min", total_min);
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    if hours < 24 {
        return if minutes > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}h", hours)
        };
    }

    let days = format!("{:.1}", total_min as f64 / MINUTES_PER_DAY);
    let days = days.strip_suffix(".0").unwrap_or(&days);
    format!("{}d", days)
}
