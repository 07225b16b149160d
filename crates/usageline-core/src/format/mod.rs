//! Human-readable time formatting for reset annotations.

pub mod duration;
pub mod reset;

pub use duration::format_duration;
pub use reset::{format_reset, TimestampError};
