//! Logic Module - escalation pipeline
//!
//! ## Layout
//! - `features/` - Reading type and the fixed classifier input layout
//! - `sensors/` - Reading Source adapters (sampler command, replay)
//! - `model/` - reading classifier bundle, fire image model, quantization
//! - `escalation/` - Escalator state machine
//! - `capture/` - still image providers
//! - `validation/` - fire confirmation cascade
//! - `dispatch/` - collector transport and voice notifier
//! - `pipeline/` - monitor loop and trigger worker
//! - `config.rs` / `errors.rs` - startup configuration and error taxonomy

// Data and models
pub mod features;
pub mod model;

// Pipeline stages
pub mod capture;
pub mod dispatch;
pub mod escalation;
pub mod pipeline;
pub mod sensors;
pub mod validation;

// Shared
pub mod config;
pub mod errors;

#[cfg(test)]
pub(crate) mod test_support;
