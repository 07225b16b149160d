//! Usage data types, shaped like the OAuth usage endpoint response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quota window reported by the usage endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Rolling five-hour window
    Short,
    /// Rolling seven-day window
    Long,
}

impl Window {
    /// Label shown in the status line
    pub fn label(self) -> &'static str {
        match self {
            Window::Short => "5h",
            Window::Long => "7d",
        }
    }
}

/// Usage of a single quota window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowUsage {
    /// Percentage consumed (may exceed 100 when over quota)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<f64>,
    /// Instant at which the window resets, nominally an RFC 3339 string.
    ///
    /// Kept as raw JSON so a malformed value only loses the annotation,
    /// not the whole snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<Value>,

    /// Other fields of the window object, persisted unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WindowUsage {
    pub fn new(utilization: f64, resets_at: Option<&str>) -> Self {
        Self {
            utilization: Some(utilization),
            resets_at: resets_at.map(Value::from),
            extra: BTreeMap::new(),
        }
    }

    /// A window object with no fields carries no data
    pub fn is_empty(&self) -> bool {
        self.utilization.is_none() && self.resets_at.is_none() && self.extra.is_empty()
    }

    /// Utilization, treating a missing value as zero
    pub fn percent(&self) -> f64 {
        self.utilization.unwrap_or(0.0)
    }
}

/// Snapshot of both quota windows.
///
/// Other top-level keys from the endpoint (additional windows, extra usage)
/// are kept in `extra` so the cache round-trips them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(rename = "five_hour", default, skip_serializing_if = "Option::is_none")]
    pub short_window: Option<WindowUsage>,

    #[serde(rename = "seven_day", default, skip_serializing_if = "Option::is_none")]
    pub long_window: Option<WindowUsage>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl UsageSnapshot {
    /// True for the "no data at all" snapshot
    pub fn is_empty(&self) -> bool {
        self.short_window.is_none() && self.long_window.is_none() && self.extra.is_empty()
    }

    /// Windows that carry data, short window first
    pub fn windows(&self) -> impl Iterator<Item = (Window, &WindowUsage)> {
        [
            (Window::Short, self.short_window.as_ref()),
            (Window::Long, self.long_window.as_ref()),
        ]
        .into_iter()
        .filter_map(|(window, usage)| usage.filter(|u| !u.is_empty()).map(|u| (window, u)))
    }
}
