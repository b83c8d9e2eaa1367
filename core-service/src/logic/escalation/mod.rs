//! Escalation Module - abnormal-run debounce
//!
//! # Architecture
//! - `escalator.rs`: `Escalator` state machine, `TriggerEvent`, snapshots
//!
//! The Escalator is owned by the monitor loop and mutated only by
//! `update(label)` and `record_outcome(seq, delivered)`. Its state is not
//! persisted: a restart begins at `Normal` with count 0.

pub mod escalator;

pub use escalator::{
    EscalationSnapshot, EscalationState, Escalator, OutcomeEffect, TriggerEvent, ZeroThreshold,
};
