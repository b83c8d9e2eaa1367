//! Fixed-file and disabled capture providers

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CaptureProvider, CaptureResult};
use crate::logic::errors::CaptureError;

/// Serves the same image file on every capture
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CaptureProvider for FileCapture {
    fn name(&self) -> &str {
        "file"
    }

    async fn capture(&self) -> Result<CaptureResult, CaptureError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| CaptureError::Read {
                path: self.path.clone(),
                source,
            })?;

        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }

        Ok(CaptureResult::image(bytes, self.path.display().to_string()))
    }
}

/// No camera at this site
pub struct DisabledCapture;

#[async_trait]
impl CaptureProvider for DisabledCapture {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn capture(&self) -> Result<CaptureResult, CaptureError> {
        Err(CaptureError::Unavailable("capture disabled".to_string()))
    }
}
