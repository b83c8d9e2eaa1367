//! Error Taxonomy
//!
//! Closed set of error kinds for the escalation pipeline. Only
//! `ModelLoadError` is fatal, and only at startup. Everything else is
//! logged and absorbed by the owning step:
//!
//! | Error                  | Policy                                   |
//! |------------------------|------------------------------------------|
//! | `SensorReadError`      | skip cycle, continue                     |
//! | `ModelLoadError`       | fatal at startup                         |
//! | `ClassificationError`  | skip cycle, log                          |
//! | `CaptureError`         | proceed without image                    |
//! | `ValidationStageError` | that stage becomes `Unavailable`         |
//! | `DispatchError`        | not delivered, Escalator keeps it armed  |
//! | `NotifierError`        | logged, never blocks escalation          |

use std::path::PathBuf;

use super::features::LayoutMismatch;

#[derive(Debug, thiserror::Error)]
pub enum SensorReadError {
    #[error("sensor sampler failed to start: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("sensor sampler I/O error: {0}")]
    Wait(#[source] std::io::Error),

    #[error("sensor sampler exited with status {status}: {stderr}")]
    Exit { status: i32, stderr: String },

    #[error("sensor sampler timed out after {0} ms")]
    Timeout(u64),

    #[error("malformed reading: {0}")]
    Malformed(String),

    #[error("replay source exhausted")]
    Exhausted,

    #[error("replay source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature-name list does not match the reading layout: {0}")]
    FeatureLayout(#[from] LayoutMismatch),

    #[error("scaler has {actual} entries, expected {expected}")]
    ScalerShape { expected: usize, actual: usize },

    #[error("invalid tree #{tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },

    #[error("onnx runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("non-finite feature '{name}'")]
    NonFinite { name: &'static str },

    #[error("ensemble produced no probability (empty forest)")]
    EmptyEnsemble,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture provider unavailable: {0}")]
    Unavailable(String),

    #[error("capture command failed to start: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capture command exited with status {status}: {stderr}")]
    Exit { status: i32, stderr: String },

    #[error("capture timed out after {0} ms")]
    Timeout(u64),

    #[error("cannot read captured image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("captured image is empty")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationStageError {
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("validator request failed: {0}")]
    Transport(String),

    #[error("validator returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("validator response malformed: {0}")]
    Response(String),

    #[error("stage task panicked or was cancelled: {0}")]
    Join(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("collector request failed: {0}")]
    Transport(String),

    #[error("collector returned HTTP {0}")]
    Status(u16),

    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("voice notifier not configured (missing {0})")]
    NotConfigured(String),

    #[error("telephony request failed: {0}")]
    Transport(String),

    #[error("telephony API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}
