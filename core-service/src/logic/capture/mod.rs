//! Capture Module - still images on demand
//!
//! # Architecture
//! - `camera.rs`: `StillCommandCamera` (exclusive still-capture command)
//! - `file.rs`: `FileCapture` and `DisabledCapture`
//!
//! # Failure Strategy
//! A failed capture never stops escalation: the trigger continues with
//! `CaptureResult::absent()` and every validation stage reports `Unavailable`.

pub mod camera;
pub mod file;

use async_trait::async_trait;
use serde::Serialize;

use crate::logic::errors::CaptureError;
use crate::logic::features::unix_now;

pub use camera::StillCommandCamera;
pub use file::{DisabledCapture, FileCapture};

/// One capture attempt. Consumed by the cascade, never kept by the Escalator.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    #[serde(skip)]
    pub image_bytes: Option<Vec<u8>>,
    /// Where the image came from (file path)
    pub artifact_ref: Option<String>,
    pub timestamp: f64,
}

impl CaptureResult {
    pub fn image(bytes: Vec<u8>, artifact_ref: impl Into<String>) -> Self {
        Self {
            image_bytes: Some(bytes),
            artifact_ref: Some(artifact_ref.into()),
            timestamp: unix_now(),
        }
    }

    pub fn absent() -> Self {
        Self {
            image_bytes: None,
            artifact_ref: None,
            timestamp: unix_now(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_bytes.as_ref().map_or(false, |b| !b.is_empty())
    }
}

#[async_trait]
pub trait CaptureProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn capture(&self) -> Result<CaptureResult, CaptureError>;
}

/// Capture, or log the error and continue without an image
pub async fn capture_or_absent(provider: &dyn CaptureProvider) -> CaptureResult {
    match provider.capture().await {
        Ok(result) => {
            log::info!(
                "Captured image via {} ({} bytes)",
                provider.name(),
                result.image_bytes.as_ref().map_or(0, Vec::len)
            );
            result
        }
        Err(e) => {
            log::warn!("[CaptureError] {}: {} - continuing without image", provider.name(), e);
            CaptureResult::absent()
        }
    }
}

/// Startup camera check: one test capture, logged, never fatal
pub async fn probe(provider: &dyn CaptureProvider) -> bool {
    match provider.capture().await {
        Ok(result) if result.has_image() => {
            log::info!(
                "Camera available: {} ({})",
                provider.name(),
                result.artifact_ref.as_deref().unwrap_or("-")
            );
            true
        }
        Ok(_) => {
            log::warn!("Camera {} returned an empty image", provider.name());
            false
        }
        Err(e) => {
            log::warn!("Camera unavailable: {}: {}", provider.name(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_capture_continues_absent() {
        let result = capture_or_absent(&DisabledCapture).await;
        assert!(!result.has_image());
        assert!(result.artifact_ref.is_none());
        assert!(!probe(&DisabledCapture).await);
    }

    #[tokio::test]
    async fn test_file_capture_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        assert!(probe(&FileCapture::new(&path)).await);
    }

    #[test]
    fn test_empty_bytes_is_no_image() {
        let r = CaptureResult::image(Vec::new(), "x.jpg");
        assert!(!r.has_image());
    }
}
