//! Random-forest ensemble evaluation
//!
//! Trees are stored in the flat array layout produced by the training
//! export: node `i` is a leaf when `children_left[i] == -1`, otherwise the
//! sample goes left when `x[feature[i]] <= threshold[i]`. `value[i]` holds
//! the per-class weight at that node.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::classifier::{ClassificationResult, Classifier, Label};
use crate::logic::errors::{ClassificationError, ModelLoadError};
use crate::logic::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};

const LEAF: i64 = -1;

/// One exported decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl Tree {
    /// Structural checks so `predict` can never index out of range or loop
    pub fn validate(&self, index: usize) -> Result<(), ModelLoadError> {
        let invalid = |reason: String| ModelLoadError::InvalidTree { tree: index, reason };

        let n = self.children_left.len();
        if n == 0 {
            return Err(invalid("no nodes".to_string()));
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(invalid("node arrays have different lengths".to_string()));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);

            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(invalid(format!("node {} has a single child", node)));
                }
                let weights = &self.value[node];
                if weights.len() != 2 {
                    return Err(invalid(format!(
                        "leaf {} has {} classes, expected 2",
                        node,
                        weights.len()
                    )));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
                    return Err(invalid(format!("leaf {} has no usable class weight", node)));
                }
                continue;
            }

            // Children always come after their parent in the export
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(invalid(format!("node {} points to child {}", node, child)));
                }
            }

            let feature = self.feature[node];
            if feature < 0 || feature >= FEATURE_COUNT as i64 {
                return Err(invalid(format!("node {} splits on feature {}", node, feature)));
            }
            if !self.threshold[node].is_finite() {
                return Err(invalid(format!("node {} has a non-finite threshold", node)));
            }
        }

        Ok(())
    }

    /// Class-1 probability at the leaf reached by `x`
    pub fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        weights[1] / (weights[0] + weights[1])
    }
}

/// Exported ensemble (`model.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    #[serde(default = "default_kind")]
    pub kind: String,
    pub trees: Vec<Tree>,
}

fn default_kind() -> String {
    "random_forest".to_string()
}

impl Forest {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.trees.is_empty() {
            return Err(ModelLoadError::InvalidTree {
                tree: 0,
                reason: "forest has no trees".to_string(),
            });
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }

    /// Mean class-1 probability across trees
    pub fn predict_proba(&self, x: &[f64; FEATURE_COUNT]) -> Option<f64> {
        if self.trees.is_empty() {
            return None;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        Some(sum / self.trees.len() as f64)
    }
}

/// Per-feature standardization (`scaler.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        for len in [self.mean.len(), self.scale.len()] {
            if len != FEATURE_COUNT {
                return Err(ModelLoadError::ScalerShape {
                    expected: FEATURE_COUNT,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    pub fn transform(&self, values: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            // zero variance feature: the trainer stores scale 1.0, older exports 0.0
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            out[i] = (values[i] - self.mean[i]) / scale;
        }
        out
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Standardize + random forest
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    scaler: Scaler,
    forest: Forest,
}

impl ForestClassifier {
    /// Both parts must already be validated (see `bundle::load_bundle`)
    pub fn new(scaler: Scaler, forest: Forest) -> Self {
        Self { scaler, forest }
    }

    pub fn tree_count(&self) -> usize {
        self.forest.trees.len()
    }
}

impl Classifier for ForestClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<ClassificationResult, ClassificationError> {
        let start = Instant::now();

        if let Some(i) = features.values.iter().position(|v| !v.is_finite()) {
            return Err(ClassificationError::NonFinite { name: FEATURE_LAYOUT[i] });
        }

        let scaled = self.scaler.transform(&features.values);
        let score = self
            .forest
            .predict_proba(&scaled)
            .ok_or(ClassificationError::EmptyEnsemble)?;

        // arg-max over two classes; a tie goes to class 0
        let label = if score > 0.5 { Label::Abnormal } else { Label::Normal };

        Ok(ClassificationResult {
            label,
            abnormal_score: score,
            latency_us: start.elapsed().as_micros() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stump on temperature (scaled): <= 0.0 normal, > 0.0 abnormal
    pub(crate) fn temperature_stump(normal: [f64; 2], abnormal: [f64; 2]) -> Tree {
        Tree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.0, -2.0, -2.0],
            value: vec![vec![10.0, 10.0], normal.to_vec(), abnormal.to_vec()],
        }
    }

    fn identity_scaler() -> Scaler {
        Scaler {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        }
    }

    fn vector(temperature: f64) -> FeatureVector {
        FeatureVector::from_values([temperature, 40.0, 1000.0, 1.0, 1.0, 1.0])
    }

    #[test]
    fn test_tree_walk() {
        let tree = temperature_stump([9.0, 1.0], [2.0, 8.0]);
        tree.validate(0).unwrap();
        let low = [-1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let high = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert!((tree.predict(&low) - 0.1).abs() < 1e-12);
        assert!((tree.predict(&high) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = Forest {
            kind: default_kind(),
            trees: vec![
                temperature_stump([1.0, 0.0], [0.0, 1.0]),
                temperature_stump([1.0, 0.0], [1.0, 1.0]),
            ],
        };
        let p = forest.predict_proba(&[5.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_standardizes_before_split() {
        // mean 30: 31.5 scales to +1.5 (abnormal side), 25.0 to -5.0
        let mut scaler = identity_scaler();
        scaler.mean[0] = 30.0;
        let forest = Forest {
            kind: default_kind(),
            trees: vec![temperature_stump([5.0, 0.0], [0.0, 5.0])],
        };
        let clf = ForestClassifier::new(scaler, forest);

        let hot = clf.classify(&vector(31.5)).unwrap();
        assert_eq!(hot.label, Label::Abnormal);
        assert_eq!(hot.abnormal_score, 1.0);

        let cool = clf.classify(&vector(25.0)).unwrap();
        assert_eq!(cool.label, Label::Normal);
    }

    #[test]
    fn test_tie_resolves_to_normal() {
        let forest = Forest {
            kind: default_kind(),
            trees: vec![temperature_stump([1.0, 1.0], [1.0, 1.0])],
        };
        let clf = ForestClassifier::new(identity_scaler(), forest);
        let result = clf.classify(&vector(3.0)).unwrap();
        assert_eq!(result.abnormal_score, 0.5);
        assert_eq!(result.label, Label::Normal);
    }

    #[test]
    fn test_zero_scale_is_treated_as_one() {
        let mut scaler = identity_scaler();
        scaler.scale[0] = 0.0;
        scaler.mean[0] = 2.0;
        let out = scaler.transform(&[5.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(out[0], 3.0);
    }

    #[test]
    fn test_non_finite_feature_rejected() {
        let clf = ForestClassifier::new(
            identity_scaler(),
            Forest {
                kind: default_kind(),
                trees: vec![temperature_stump([1.0, 0.0], [0.0, 1.0])],
            },
        );
        let mut fv = vector(1.0);
        fv.values[2] = f64::INFINITY;
        match clf.classify(&fv) {
            Err(ClassificationError::NonFinite { name }) => assert_eq!(name, "pressure"),
            other => panic!("Expected NonFinite, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_backward_child_pointer() {
        let mut tree = temperature_stump([1.0, 0.0], [0.0, 1.0]);
        tree.children_right[0] = 0;
        assert!(matches!(tree.validate(3), Err(ModelLoadError::InvalidTree { tree: 3, .. })));
    }

    #[test]
    fn test_reject_split_on_unknown_feature() {
        let mut tree = temperature_stump([1.0, 0.0], [0.0, 1.0]);
        tree.feature[0] = 6;
        assert!(tree.validate(0).is_err());
    }

    #[test]
    fn test_reject_multiclass_leaf() {
        let mut tree = temperature_stump([1.0, 0.0], [0.0, 1.0]);
        tree.value[1] = vec![1.0, 0.0, 0.0];
        assert!(tree.validate(0).is_err());
    }
}
