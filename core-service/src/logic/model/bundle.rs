//! Classifier Bundle Loader
//!
//! A bundle is three files exported by the training job into one directory:
//!
//! - `model.json` - random-forest ensemble (tree arrays)
//! - `scaler.json` - per-feature mean / scale
//! - `feature_names.json` - ordered feature names used at training time
//!
//! All three are loaded once at startup. Any failure is a `ModelLoadError`
//! and aborts the agent; there is no fallback classifier.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::forest::{Forest, ForestClassifier, Scaler};
use crate::logic::errors::ModelLoadError;
use crate::logic::features::{layout_hash, validate_feature_names, FEATURE_VERSION};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";

/// Where the bundle lives and how to verify it
#[derive(Debug, Clone)]
pub struct BundleSource {
    pub dir: PathBuf,
    /// Expected SHA-256 (hex) of `model.json`
    pub model_sha256: Option<String>,
}

impl BundleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            model_sha256: None,
        }
    }

    pub fn with_checksum(mut self, sha256: Option<String>) -> Self {
        self.model_sha256 = sha256;
        self
    }
}

/// Loaded and validated bundle
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    pub classifier: ForestClassifier,
    pub feature_names: Vec<String>,
    pub model_sha256: String,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ModelLoadError> {
    fs::read(path).map_err(|source| ModelLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ModelLoadError> {
    serde_json::from_slice(bytes).map_err(|source| ModelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Load all three artifacts and validate them against the feature layout
pub fn load_bundle(source: &BundleSource) -> Result<LoadedBundle, ModelLoadError> {
    let names_path = source.dir.join(FEATURE_NAMES_FILE);
    let scaler_path = source.dir.join(SCALER_FILE);
    let model_path = source.dir.join(MODEL_FILE);

    // Feature order first: a misordered bundle must never reach classify()
    let feature_names: Vec<String> = parse_json(&names_path, &read_bytes(&names_path)?)?;
    validate_feature_names(&feature_names[..])?;

    let scaler: Scaler = parse_json(&scaler_path, &read_bytes(&scaler_path)?)?;
    scaler.validate()?;

    let model_bytes = read_bytes(&model_path)?;
    let digest = sha256_hex(&model_bytes);
    if let Some(expected) = &source.model_sha256 {
        if !expected.eq_ignore_ascii_case(&digest) {
            return Err(ModelLoadError::Checksum {
                expected: expected.clone(),
                actual: digest,
            });
        }
    }

    let forest: Forest = parse_json(&model_path, &model_bytes)?;
    forest.validate()?;

    log::info!(
        "Classifier bundle loaded from {} ({} trees, layout v{} hash {:08x}, sha256 {})",
        source.dir.display(),
        forest.trees.len(),
        FEATURE_VERSION,
        layout_hash(),
        &digest[..12]
    );

    Ok(LoadedBundle {
        classifier: ForestClassifier::new(scaler, forest),
        feature_names,
        model_sha256: digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::errors::ModelLoadError;
    use crate::logic::features::{FeatureVector, FEATURE_LAYOUT};
    use crate::logic::model::{Classifier, Label};
    use serde_json::json;

    const MODEL: &str = r#"{
        "kind": "random_forest",
        "trees": [{
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [0, -2, -2],
            "threshold": [0.0, -2.0, -2.0],
            "value": [[5.0, 5.0], [5.0, 0.0], [0.0, 5.0]]
        }]
    }"#;

    fn write_bundle(dir: &Path, names: serde_json::Value) {
        fs::write(dir.join(FEATURE_NAMES_FILE), names.to_string()).unwrap();
        fs::write(
            dir.join(SCALER_FILE),
            json!({"mean": [25.0, 40.0, 1000.0, 0.0, 0.0, 0.0], "scale": [5.0, 1.0, 1.0, 1.0, 1.0, 1.0]})
                .to_string(),
        )
        .unwrap();
        fs::write(dir.join(MODEL_FILE), MODEL).unwrap();
    }

    #[test]
    fn test_load_valid_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), json!(FEATURE_LAYOUT));

        let bundle = load_bundle(&BundleSource::new(dir.path())).unwrap();
        assert_eq!(bundle.feature_names.len(), 6);
        assert_eq!(bundle.classifier.tree_count(), 1);

        let hot = FeatureVector::from_values([40.0, 40.0, 1000.0, 0.0, 0.0, 0.0]);
        assert_eq!(bundle.classifier.classify(&hot).unwrap().label, Label::Abnormal);
    }

    #[test]
    fn test_reject_misordered_feature_names() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(
            dir.path(),
            json!(["humidity", "temperature", "pressure", "gas_oxidising", "gas_reducing", "gas_nh3"]),
        );

        match load_bundle(&BundleSource::new(dir.path())) {
            Err(ModelLoadError::FeatureLayout(_)) => {}
            other => panic!("Expected FeatureLayout error, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), json!(FEATURE_LAYOUT));
        fs::remove_file(dir.path().join(SCALER_FILE)).unwrap();

        assert!(matches!(
            load_bundle(&BundleSource::new(dir.path())),
            Err(ModelLoadError::Read { .. })
        ));
    }

    #[test]
    fn test_reject_short_scaler() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), json!(FEATURE_LAYOUT));
        fs::write(dir.path().join(SCALER_FILE), r#"{"mean":[0,0],"scale":[1,1]}"#).unwrap();

        assert!(matches!(
            load_bundle(&BundleSource::new(dir.path())),
            Err(ModelLoadError::ScalerShape { expected: 6, actual: 2 })
        ));
    }

    #[test]
    fn test_checksum_verification() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), json!(FEATURE_LAYOUT));

        let good = sha256_hex(MODEL.as_bytes()).to_uppercase();
        let ok = BundleSource::new(dir.path()).with_checksum(Some(good));
        assert!(load_bundle(&ok).is_ok());

        let bad = BundleSource::new(dir.path()).with_checksum(Some("00".repeat(32)));
        assert!(matches!(load_bundle(&bad), Err(ModelLoadError::Checksum { .. })));
    }

    #[test]
    fn test_reject_garbage_model() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), json!(FEATURE_LAYOUT));
        fs::write(dir.path().join(MODEL_FILE), "not json").unwrap();

        assert!(matches!(
            load_bundle(&BundleSource::new(dir.path())),
            Err(ModelLoadError::Parse { .. })
        ));
    }
}
