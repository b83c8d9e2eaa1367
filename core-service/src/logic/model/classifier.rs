//! Classifier contract
//!
//! Maps a feature vector to Normal/Abnormal plus an abnormal probability.
//! Implementations own their persisted standardization and model.

use serde::{Deserialize, Serialize};

use crate::logic::errors::ClassificationError;
use crate::logic::features::FeatureVector;

/// Binary reading label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Abnormal,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Abnormal => "abnormal",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, Label::Abnormal)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification output (derived, never persisted)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Probability of the abnormal class, 0.0 - 1.0
    pub abnormal_score: f64,
    pub latency_us: u64,
}

/// Anything that can label a reading
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<ClassificationResult, ClassificationError>;
}
