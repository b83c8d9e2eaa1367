//! Validation Cascade
//!
//! Stages run cheapest first. `Unavailable` stages are skipped, the first
//! `NoFire` ends the cascade (costlier stages never run), and a `Fire`
//! only sets a pending positive that a later stage may still overrule.

use std::sync::Arc;
use std::time::Instant;

use super::types::{
    CascadeReport, FailPolicy, StageOutcome, StageVerdict, UnavailableReason, Verdict,
};
use super::ValidationStage;
use crate::logic::capture::CaptureResult;

pub struct ValidationCascade {
    stages: Vec<Arc<dyn ValidationStage>>,
    policy: FailPolicy,
}

impl ValidationCascade {
    pub fn new(policy: FailPolicy) -> Self {
        Self {
            stages: Vec::new(),
            policy,
        }
    }

    /// Append a stage (evaluation order = insertion order)
    pub fn with_stage(mut self, stage: Arc<dyn ValidationStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn policy(&self) -> FailPolicy {
        self.policy
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    pub async fn run(&self, capture: &CaptureResult) -> CascadeReport {
        match capture.image_bytes.as_deref() {
            Some(bytes) if !bytes.is_empty() => self.evaluate(Some(bytes)).await,
            _ => self.evaluate(None).await,
        }
    }

    pub async fn evaluate(&self, image: Option<&[u8]>) -> CascadeReport {
        let mut outcomes = Vec::with_capacity(self.stages.len());

        let image = match image {
            Some(bytes) => bytes,
            None => {
                for stage in &self.stages {
                    outcomes.push(skipped(stage.as_ref(), UnavailableReason::NoImage));
                }
                return self.finish(outcomes, Verdict::Unavailable);
            }
        };

        let mut pending_fire = false;

        for stage in &self.stages {
            if !stage.enabled() {
                outcomes.push(skipped(stage.as_ref(), UnavailableReason::Disabled));
                continue;
            }

            let start = Instant::now();
            let verdict = match stage.evaluate(image).await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("[ValidationStageError] {}: {}", stage.name(), e);
                    StageVerdict::unavailable(UnavailableReason::Error(e.to_string()))
                }
            };
            let elapsed_ms = start.elapsed().as_millis() as u64;

            log::info!("Validation stage {} -> {:?} ({} ms)", stage.name(), verdict, elapsed_ms);

            let short_circuit = match &verdict {
                StageVerdict::NoFire { .. } => true,
                StageVerdict::Fire { .. } => {
                    pending_fire = true;
                    false
                }
                StageVerdict::Unavailable { .. } => false,
            };

            outcomes.push(StageOutcome {
                stage: stage.name().to_string(),
                kind: stage.kind(),
                verdict,
                elapsed_ms,
            });

            if short_circuit {
                return self.finish(outcomes, Verdict::NoFire);
            }
        }

        let raw = if pending_fire { Verdict::Fire } else { Verdict::Unavailable };
        self.finish(outcomes, raw)
    }

    fn finish(&self, stages: Vec<StageOutcome>, raw: Verdict) -> CascadeReport {
        let fail_open_applied = raw == Verdict::Unavailable && self.policy == FailPolicy::Open;
        let decision = if fail_open_applied { Verdict::Fire } else { raw };

        let fire_confidence = stages
            .iter()
            .filter_map(|s| match s.verdict {
                StageVerdict::Fire { confidence } => Some(confidence),
                _ => None,
            })
            .fold(0.0_f64, f64::max);

        if fail_open_applied {
            log::warn!("No validation stage produced a verdict; escalating (fail-open)");
        }

        CascadeReport {
            stages,
            raw,
            decision,
            fail_open_applied,
            fire_confidence,
        }
    }
}

fn skipped(stage: &dyn ValidationStage, reason: UnavailableReason) -> StageOutcome {
    StageOutcome {
        stage: stage.name().to_string(),
        kind: stage.kind(),
        verdict: StageVerdict::unavailable(reason),
        elapsed_ms: 0,
    }
}
