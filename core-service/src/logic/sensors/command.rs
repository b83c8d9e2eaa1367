//! Command Source - one sampler process per reading
//!
//! The sampler prints a single JSON object on stdout and exits 0.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{RawReading, ReadingSource};
use crate::logic::errors::SensorReadError;
use crate::logic::features::Reading;

/// Split a command line on whitespace into program + args
pub(crate) fn split_command(command_line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    /// `None` for an empty command line
    pub fn new(command_line: &str, timeout: Duration) -> Option<Self> {
        let (program, args) = split_command(command_line)?;
        Some(Self { program, args, timeout })
    }
}

#[async_trait]
impl ReadingSource for CommandSource {
    fn name(&self) -> &str {
        &self.program
    }

    async fn sample(&mut self) -> Result<Reading, SensorReadError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SensorReadError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SensorReadError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(SensorReadError::Wait)?;

        if !output.status.success() {
            return Err(SensorReadError::Exit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // Drivers sometimes print warnings first; the reading is the last line
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| SensorReadError::Malformed("sampler printed nothing".to_string()))?;

        RawReading::parse(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("python3  read_bme.py --once").unwrap();
        assert_eq!(program, "python3");
        assert_eq!(args, vec!["read_bme.py", "--once"]);
        assert!(split_command("   ").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sample_from_echo() {
        let mut source = CommandSource::new(
            r#"echo {"temperature":21.0,"humidity":40.0,"pressure":1000.0,"gas_oxidising":1.0,"gas_reducing":2.0,"gas_nh3":3.0}"#,
            Duration::from_secs(5),
        )
        .unwrap();

        let reading = source.sample().await.unwrap();
        assert_eq!(reading.temperature, 21.0);
        assert_eq!(reading.gas_nh3, 3.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit() {
        let mut source = CommandSource::new("false", Duration::from_secs(5)).unwrap();
        assert!(matches!(source.sample().await, Err(SensorReadError::Exit { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let mut source = CommandSource::new("sleep 5", Duration::from_millis(100)).unwrap();
        assert!(matches!(source.sample().await, Err(SensorReadError::Timeout(100))));
    }

    #[test]
    fn test_wait_error_names_the_sampler() {
        let err = SensorReadError::Wait(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"));
        assert_eq!(err.to_string(), "sensor sampler I/O error: pipe closed");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let mut source =
            CommandSource::new("/nonexistent/firesentinel-sampler", Duration::from_secs(1)).unwrap();
        assert!(matches!(source.sample().await, Err(SensorReadError::Spawn(_))));
    }
}
