//! Pipeline Module - monitor loop and trigger handling
//!
//! # Architecture
//! ```text
//!   interval ─▶ Monitor::cycle ─▶ ReadingSource ─▶ Classifier ─▶ Escalator
//!                     ▲                                             │ trigger
//!                     │ resolution                                  ▼
//!                     └──────────── worker: TriggerHandler ◀── queue(1)
//!                                    capture ─▶ cascade ─▶ notify + send
//! ```
//!
//! # Failure Strategy
//! Sensor and classifier errors skip the cycle. Capture, stage and
//! dispatch errors are absorbed inside the handler and come back as a
//! not-delivered resolution, which leaves the Escalator armed.

pub mod handler;
pub mod monitor;

pub use handler::{TriggerHandler, TriggerJob, TriggerResolution};
pub use monitor::{CycleOutcome, Monitor};
