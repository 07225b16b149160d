//! Core library for usageline.
//!
//! Fetches Claude usage limits (with an on-disk cache and stale fallback),
//! and turns them into a compact two-line status string.

pub mod clock;
pub mod format;
pub mod render;
pub mod usage;

pub use clock::{Clock, SystemClock};
pub use render::StatusRenderer;
pub use usage::{UsageClient, UsageSnapshot, WindowUsage};
