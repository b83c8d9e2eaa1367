//! Reading & Feature Vector
//!
//! A `Reading` is one immutable sample from the sensor board. The classifier
//! never sees a `Reading` directly: it sees a `FeatureVector` built in
//! `FEATURE_LAYOUT` order.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::layout::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};

// ============================================================================
// READING
// ============================================================================

/// One sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unix seconds (fractional)
    pub timestamp: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub gas_oxidising: f64,
    pub gas_reducing: f64,
    pub gas_nh3: f64,
}

impl Reading {
    /// Features in layout order
    pub fn features(&self) -> FeatureVector {
        FeatureVector::from_values([
            self.temperature,
            self.humidity,
            self.pressure,
            self.gas_oxidising,
            self.gas_reducing,
            self.gas_nh3,
        ])
    }

    /// The six measured values without the timestamp (payload `last_reading`)
    pub fn values(&self) -> ReadingValues {
        ReadingValues {
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
            gas_oxidising: self.gas_oxidising,
            gas_reducing: self.gas_reducing,
            gas_nh3: self.gas_nh3,
        }
    }
}

/// Measured values as they travel in an alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingValues {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub gas_oxidising: f64,
    pub gas_reducing: f64,
    pub gas_nh3: f64,
}

impl ReadingValues {
    pub fn at(self, timestamp: f64) -> Reading {
        Reading {
            timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
            gas_oxidising: self.gas_oxidising,
            gas_reducing: self.gas_reducing,
            gas_nh3: self.gas_nh3,
        }
    }
}

/// Current wall clock as fractional Unix seconds
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Versioned feature vector (values in FEATURE_LAYOUT order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reading {
        Reading {
            timestamp: 1_700_000_000.5,
            temperature: 31.5,
            humidity: 23.1,
            pressure: 1007.2,
            gas_oxidising: 4500.0,
            gas_reducing: 280000.0,
            gas_nh3: 12000.0,
        }
    }

    #[test]
    fn test_features_follow_layout() {
        let fv = sample().features();
        assert_eq!(fv.get_by_name("temperature"), Some(31.5));
        assert_eq!(fv.get_by_name("pressure"), Some(1007.2));
        assert_eq!(fv.get_by_name("gas_nh3"), Some(12000.0));
        assert_eq!(fv.values[4], 280000.0);
        assert_eq!(fv.version, FEATURE_VERSION);
    }

    #[test]
    fn test_values_roundtrip_keeps_timestamp() {
        let r = sample();
        assert_eq!(r.values().at(r.timestamp), r);
    }

    #[test]
    fn test_non_finite_detected() {
        let mut r = sample();
        r.humidity = f64::NAN;
        assert!(!r.features().is_finite());
    }
}
