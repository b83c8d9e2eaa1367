//! Edge stage - local ONNX wildfire model
//!
//! Decodes the captured JPEG, resizes it to the model's square input and
//! scores it on a blocking thread. The probability (dequantized when the
//! model output is u8) is compared against the fire cutoff.

use async_trait::async_trait;
use image::imageops::FilterType;

use super::types::{StageKind, StageVerdict};
use super::ValidationStage;
use crate::logic::errors::ValidationStageError;
use crate::logic::model::{FireCutoff, FireModel};

pub struct EdgeModelStage {
    model: Option<FireModel>,
    cutoff: FireCutoff,
    enabled: bool,
}

impl EdgeModelStage {
    pub fn new(model: FireModel, cutoff: FireCutoff) -> Self {
        Self {
            model: Some(model),
            cutoff,
            enabled: true,
        }
    }

    /// Stage whose model could not be loaded; always reports Unavailable
    pub fn without_model(cutoff: FireCutoff) -> Self {
        Self {
            model: None,
            cutoff,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Decode and resize to `size`×`size` RGB, row-major
pub fn preprocess(bytes: &[u8], size: u32) -> Result<Vec<u8>, ValidationStageError> {
    let img = image::load_from_memory(bytes).map_err(|e| ValidationStageError::Decode(e.to_string()))?;
    Ok(img.resize_exact(size, size, FilterType::Triangle).to_rgb8().into_raw())
}

/// Probability → verdict (Fire iff probability ≥ cutoff)
pub fn verdict_for(probability: f64, cutoff: FireCutoff) -> StageVerdict {
    if cutoff.is_fire(probability) {
        StageVerdict::Fire { confidence: probability }
    } else {
        StageVerdict::NoFire { confidence: probability }
    }
}

#[async_trait]
impl ValidationStage for EdgeModelStage {
    fn name(&self) -> &str {
        "edge-model"
    }

    fn kind(&self) -> StageKind {
        StageKind::Edge
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn evaluate(&self, image: &[u8]) -> Result<StageVerdict, ValidationStageError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| ValidationStageError::Inference("fire model not loaded".to_string()))?;
        let bytes = image.to_vec();

        let score = tokio::task::spawn_blocking(move || {
            let rgb = preprocess(&bytes, model.input_size())?;
            model.score_rgb(&rgb).map_err(ValidationStageError::Inference)
        })
        .await
        .map_err(|e| ValidationStageError::Join(e.to_string()))??;

        log::info!(
            "Fire detection result: probability {:.4} (cutoff {:.2}, inference time: {:.2} ms)",
            score.probability,
            self.cutoff.value(),
            score.inference_time_us as f64 / 1000.0
        );

        Ok(verdict_for(score.probability, self.cutoff))
    }
}
