//! Status line rendering: one `"<label>: <pct>%<reset>"` line per window.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::clock::Clock;
use crate::format::format_reset;
use crate::usage::{UsageApi, UsageClient, UsageSnapshot, WindowUsage};

/// UTC-06:00, the billing day boundary
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -360;

/// Renders usage snapshots in a fixed civil timezone
#[derive(Debug, Clone, Copy)]
pub struct StatusRenderer {
    tz: FixedOffset,
}

impl Default for StatusRenderer {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
            .unwrap_or_else(|| Self::new(Utc.fix()))
    }
}

impl StatusRenderer {
    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }

    /// `None` when the offset is outside ±24h
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    /// Fetch through `client` and render the result
    pub fn render_status<A: UsageApi, C: Clock>(&self, client: &UsageClient<A, C>) -> String {
        let snapshot = client.fetch();
        self.render(&snapshot, client.now())
    }

    /// Render every window present in `snapshot`, newline separated.
    ///
    /// An empty snapshot renders as an empty string.
    pub fn render(&self, snapshot: &UsageSnapshot, now: DateTime<Utc>) -> String {
        snapshot
            .windows()
            .map(|(window, usage)| self.render_window(window.label(), usage, now))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_window(&self, label: &str, usage: &WindowUsage, now: DateTime<Utc>) -> String {
        format!(
            "{}: {}%{}",
            label,
            round_percent(usage.percent()),
            format_reset(usage.resets_at.as_ref(), now, self.tz)
        )
    }
}

/// Nearest integer, halves rounded up
fn round_percent(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
