//! usageline — Claude usage limits as a compact status line.
//!
//! The binary wires [`config::Settings`] into `usageline_core`.

pub mod config;
