//! Sensors Module - Reading Source adapters
//!
//! The board driver itself is outside this crate. The agent consumes
//! readings through `ReadingSource`, either by running a sampler command
//! once per cycle or by replaying a recorded JSON-lines session.

pub mod command;
pub mod replay;

use async_trait::async_trait;

use crate::logic::errors::SensorReadError;
use crate::logic::features::Reading;

pub use command::CommandSource;
pub use replay::ReplaySource;

/// Produces one `Reading` per call
#[async_trait]
pub trait ReadingSource: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn sample(&mut self) -> Result<Reading, SensorReadError>;
}

/// Wire form of a reading; `timestamp` may be omitted by the sampler
#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct RawReading {
    #[serde(default)]
    pub timestamp: Option<f64>,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub gas_oxidising: f64,
    pub gas_reducing: f64,
    pub gas_nh3: f64,
}

impl RawReading {
    pub(crate) fn parse(text: &str) -> Result<Reading, SensorReadError> {
        let raw: RawReading = serde_json::from_str(text.trim())
            .map_err(|e| SensorReadError::Malformed(e.to_string()))?;

        Ok(Reading {
            timestamp: raw.timestamp.unwrap_or_else(crate::logic::features::unix_now),
            temperature: raw.temperature,
            humidity: raw.humidity,
            pressure: raw.pressure,
            gas_oxidising: raw.gas_oxidising,
            gas_reducing: raw.gas_reducing,
            gas_nh3: raw.gas_nh3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_timestamp() {
        let r = RawReading::parse(
            r#"{"timestamp": 1700000000.25, "temperature": 22.5, "humidity": 41.0,
                "pressure": 1012.3, "gas_oxidising": 3.1, "gas_reducing": 210.0, "gas_nh3": 55.0}"#,
        )
        .unwrap();
        assert_eq!(r.timestamp, 1700000000.25);
        assert_eq!(r.gas_reducing, 210.0);
    }

    #[test]
    fn test_parse_stamps_missing_timestamp() {
        let r = RawReading::parse(
            r#"{"temperature": 22.5, "humidity": 41.0, "pressure": 1012.3,
                "gas_oxidising": 3.1, "gas_reducing": 210.0, "gas_nh3": 55.0, "light": 120.0}"#,
        )
        .unwrap();
        assert!(r.timestamp > 1_600_000_000.0);
    }

    #[test]
    fn test_parse_missing_field() {
        let err = RawReading::parse(r#"{"temperature": 22.5}"#).unwrap_err();
        assert!(matches!(err, SensorReadError::Malformed(_)));
    }
}
