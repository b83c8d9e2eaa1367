//! Validation Module - fire confirmation cascade
//!
//! # Architecture
//! - `types.rs`: verdicts, `FailPolicy`, `CascadeReport`
//! - `cascade.rs`: `ValidationCascade` (ordering, short-circuit, fail policy)
//! - `edge.rs`: local ONNX image model stage
//! - `vision.rs`: hosted vision-language validator stage
//! - `answer.rs`: YES / NO reply parser
//!
//! # Failure Strategy
//! A stage error only makes that stage `Unavailable`. When every stage is
//! unavailable the `FailPolicy` decides whether to escalate.

pub mod answer;
pub mod cascade;
pub mod edge;
pub mod types;
pub mod vision;

use async_trait::async_trait;

use crate::logic::errors::ValidationStageError;

pub use answer::{parse_answer, ValidatorAnswer};
pub use cascade::ValidationCascade;
pub use edge::EdgeModelStage;
pub use types::{
    CascadeReport, FailPolicy, StageKind, StageOutcome, StageVerdict, UnavailableReason, Verdict,
};
pub use vision::{VisionValidatorConfig, VisionValidatorStage};

/// One independent fire check
#[async_trait]
pub trait ValidationStage: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> StageKind;

    /// Disabled stages are recorded as `Unavailable(Disabled)` and never invoked
    fn enabled(&self) -> bool {
        true
    }

    async fn evaluate(&self, image: &[u8]) -> Result<StageVerdict, ValidationStageError>;
}
