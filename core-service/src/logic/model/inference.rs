//! Fire Image Model - ONNX Runtime Integration
//!
//! Loads the edge wildfire classifier and scores one RGB image.
//! Input geometry, input dtype and output quantization come from a JSON
//! sidecar next to the model (`wildfire_model.onnx` -> `wildfire_model.json`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::threshold::QuantizationParams;
use crate::logic::errors::ModelLoadError;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Element type the model expects for its NHWC image input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputDtype {
    /// Raw 0-255 pixels (quantized export)
    U8,
    /// Pixels scaled to 0.0-1.0
    F32,
}

/// Sidecar metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireModelMeta {
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_input_dtype")]
    pub input_dtype: InputDtype,
    /// Present when the output tensor is u8
    #[serde(default)]
    pub output_quantization: Option<QuantizationParams>,
}

fn default_input_size() -> u32 {
    224
}

fn default_input_dtype() -> InputDtype {
    InputDtype::U8
}

impl Default for FireModelMeta {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            input_dtype: default_input_dtype(),
            output_quantization: None,
        }
    }
}

/// One scored image
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FireScore {
    pub probability: f64,
    pub inference_time_us: u64,
}

/// Sidecar path for a model file
pub fn meta_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("json")
}

// ============================================================================
// MODEL
// ============================================================================

/// Loaded ONNX session plus its metadata.
/// Cloning shares the session; runs are serialized by the mutex.
#[derive(Clone)]
pub struct FireModel {
    session: Arc<Mutex<Session>>,
    output_name: String,
    meta: FireModelMeta,
    path: PathBuf,
}

impl std::fmt::Debug for FireModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireModel")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish()
    }
}

impl FireModel {
    /// Load ONNX model and sidecar
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        log::info!("Loading fire model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ModelLoadError::Read {
                path: model_path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "model not found"),
            });
        }

        let meta_file = meta_path(model_path);
        let meta = match std::fs::read(&meta_file) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| ModelLoadError::Parse {
                path: meta_file.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No sidecar at {}, assuming 224x224 u8 input", meta_file.display());
                FireModelMeta::default()
            }
            Err(source) => return Err(ModelLoadError::Read { path: meta_file, source }),
        };

        let session = Session::builder()
            .map_err(|e| ModelLoadError::Runtime(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelLoadError::Runtime(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ModelLoadError::Runtime(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelLoadError::Runtime("No output defined".to_string()))?;

        log::info!(
            "Fire model loaded ({}x{} {:?} input, quantized output: {})",
            meta.input_size,
            meta.input_size,
            meta.input_dtype,
            meta.output_quantization.is_some()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            output_name,
            meta,
            path: model_path.to_path_buf(),
        })
    }

    pub fn input_size(&self) -> u32 {
        self.meta.input_size
    }

    /// Score pre-sized RGB pixels (`input_size`² × 3, row-major).
    /// Blocking; call from a blocking thread.
    pub fn score_rgb(&self, rgb: &[u8]) -> Result<FireScore, String> {
        let start = Instant::now();
        let side = self.meta.input_size as usize;
        let shape = (1, side, side, 3);

        let input = match self.meta.input_dtype {
            InputDtype::U8 => {
                let array = Array4::<u8>::from_shape_vec(shape, rgb.to_vec())
                    .map_err(|e| format!("Array error: {}", e))?;
                Value::from_array(array)
                    .map_err(|e| format!("Tensor error: {}", e))?
                    .into_dyn()
            }
            InputDtype::F32 => {
                let pixels: Vec<f32> = rgb.iter().map(|p| *p as f32 / 255.0).collect();
                let array = Array4::<f32>::from_shape_vec(shape, pixels)
                    .map_err(|e| format!("Array error: {}", e))?;
                Value::from_array(array)
                    .map_err(|e| format!("Tensor error: {}", e))?
                    .into_dyn()
            }
        };

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| format!("Inference failed: {}", e))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| "No output".to_string())?;

        // First element of the first row, like `output[0][0]`
        let probability = match self.meta.output_quantization {
            Some(q) => {
                let tensor = output
                    .try_extract_tensor::<u8>()
                    .map_err(|e| format!("Extract error: {}", e))?;
                let raw = *tensor.1.first().ok_or_else(|| "Empty output".to_string())?;
                q.dequantize(raw)
            }
            None => {
                let tensor = output
                    .try_extract_tensor::<f32>()
                    .map_err(|e| format!("Extract error: {}", e))?;
                *tensor.1.first().ok_or_else(|| "Empty output".to_string())? as f64
            }
        };

        Ok(FireScore {
            probability,
            inference_time_us: start.elapsed().as_micros() as u64,
        })
    }
}
