//! Still-command camera
//!
//! Runs a still-capture tool (default `rpicam-still`) that owns the sensor
//! for the duration of one shot. The async lock is held from acquire to
//! release, so captures never overlap. The child is spawned with
//! `kill_on_drop`, which releases the camera on timeout or cancellation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tokio::sync::Mutex;

use super::{CaptureProvider, CaptureResult};
use crate::logic::errors::CaptureError;
use crate::logic::sensors::command::split_command;

pub struct StillCommandCamera {
    program: String,
    extra_args: Vec<String>,
    capture_dir: PathBuf,
    warmup: Duration,
    timeout: Duration,
    lock: Mutex<()>,
}

impl StillCommandCamera {
    /// `None` for an empty command line
    pub fn new(
        command_line: &str,
        capture_dir: impl AsRef<Path>,
        warmup: Duration,
        timeout: Duration,
    ) -> Option<Self> {
        let (program, extra_args) = split_command(command_line)?;
        Some(Self {
            program,
            extra_args,
            capture_dir: capture_dir.as_ref().to_path_buf(),
            warmup,
            timeout,
            lock: Mutex::new(()),
        })
    }

    fn next_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let unique = uuid::Uuid::new_v4().simple().to_string();
        self.capture_dir
            .join(format!("capture_{}_{}.jpg", stamp, &unique[..8]))
    }

    /// Arguments after the program: user extras, then preview/warm-up/output
    pub(crate) fn build_args(&self, output: &Path) -> Vec<String> {
        let mut args = self.extra_args.clone();
        args.push("--nopreview".to_string());
        args.push("-t".to_string());
        args.push(self.warmup.as_millis().to_string());
        args.push("-o".to_string());
        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl CaptureProvider for StillCommandCamera {
    fn name(&self) -> &str {
        &self.program
    }

    async fn capture(&self) -> Result<CaptureResult, CaptureError> {
        // acquire
        let _camera = self.lock.lock().await;

        tokio::fs::create_dir_all(&self.capture_dir)
            .await
            .map_err(|source| CaptureError::Read {
                path: self.capture_dir.clone(),
                source,
            })?;

        // configure + warm-up + capture happen inside the tool
        let output_path = self.next_path();
        let child = Command::new(&self.program)
            .args(self.build_args(&output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(CaptureError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(CaptureError::Spawn)?;

        if !output.status.success() {
            return Err(CaptureError::Exit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|source| CaptureError::Read {
                path: output_path.clone(),
                source,
            })?;

        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }

        // release: `_camera` drops here
        Ok(CaptureResult::image(bytes, output_path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(command: &str, dir: &Path) -> StillCommandCamera {
        StillCommandCamera::new(command, dir, Duration::from_millis(2000), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_args() {
        let cam = camera("rpicam-still --width 1280", Path::new("/tmp/captures"));
        let args = cam.build_args(Path::new("/tmp/captures/a.jpg"));
        assert_eq!(
            args,
            vec!["--width", "1280", "--nopreview", "-t", "2000", "-o", "/tmp/captures/a.jpg"]
        );
    }

    #[test]
    fn test_unique_paths() {
        let cam = camera("rpicam-still", Path::new("captures"));
        assert_ne!(cam.next_path(), cam.next_path());
    }

    #[tokio::test]
    async fn test_missing_tool_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let cam = camera("/nonexistent/rpicam-still", dir.path());
        assert!(matches!(cam.capture().await, Err(CaptureError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_without_output_file() {
        // `true` ignores its arguments and writes nothing
        let dir = tempfile::tempdir().unwrap();
        let cam = camera("true", dir.path());
        assert!(matches!(cam.capture().await, Err(CaptureError::Read { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lock_released_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cam = camera("false", dir.path());
        assert!(matches!(cam.capture().await, Err(CaptureError::Exit { .. })));
        // a second capture must not deadlock
        assert!(cam.capture().await.is_err());
    }
}
