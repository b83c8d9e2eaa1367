//! Model Module - Reading classifier and fire image model
//!
//! - `classifier` / `forest` / `bundle`: sensor-reading anomaly classifier
//! - `inference`: ONNX wildfire image model for the edge validation stage
//! - `threshold`: output dequantization and fire cutoff

pub mod bundle;
pub mod classifier;
pub mod forest;
pub mod inference;
pub mod threshold;

// Re-export common types
pub use bundle::{load_bundle, sha256_hex, BundleSource, LoadedBundle};
pub use classifier::{ClassificationResult, Classifier, Label};
pub use forest::{Forest, ForestClassifier, Scaler, Tree};
pub use inference::{FireModel, FireModelMeta, FireScore, InputDtype};
pub use threshold::{FireCutoff, QuantizationParams};
