//! FireSentinel core - edge escalation pipeline
//!
//! Shared by the edge agent binary and the remote collector.

pub mod constants;
pub mod logic;
