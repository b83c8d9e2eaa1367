//! Fire Probability Threshold
//!
//! Quantized model outputs are converted back to a probability with the
//! model's own `scale`/`zero_point`, then compared against the fire cutoff.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_FIRE_CUTOFF;

/// Per-model affine quantization of an 8-bit output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationParams {
    pub scale: f64,
    pub zero_point: i64,
}

impl QuantizationParams {
    pub fn new(scale: f64, zero_point: i64) -> Self {
        Self { scale, zero_point }
    }

    /// `(raw - zero_point) * scale`
    pub fn dequantize(&self, raw: u8) -> f64 {
        (raw as i64 - self.zero_point) as f64 * self.scale
    }
}

/// Minimum probability that counts as fire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireCutoff(f64);

impl Default for FireCutoff {
    fn default() -> Self {
        Self(DEFAULT_FIRE_CUTOFF)
    }
}

impl FireCutoff {
    /// Cutoff must lie in [0, 1]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Probability at or above the cutoff is fire
    pub fn is_fire(&self, probability: f64) -> bool {
        probability >= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequantize_known_triples() {
        let cases = [
            (255u8, 1.0 / 255.0, 0i64, 1.0),
            (0u8, 1.0 / 255.0, 0i64, 0.0),
            (128u8, 0.00390625, 0i64, 0.5),
            (200u8, 0.00390625, 72i64, 0.5),
            (10u8, 0.1, 20i64, -1.0),
        ];

        for (raw, scale, zero_point, expected) in cases {
            let q = QuantizationParams::new(scale, zero_point);
            let p = q.dequantize(raw);
            assert!(
                (p - expected).abs() < 1e-6,
                "raw={} scale={} zp={} -> {} (expected {})",
                raw, scale, zero_point, p, expected
            );
        }
    }

    #[test]
    fn test_default_cutoff() {
        assert_eq!(FireCutoff::default().value(), 0.5);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let cutoff = FireCutoff::default();
        assert!(cutoff.is_fire(0.5));
        assert!(cutoff.is_fire(0.93));
        assert!(!cutoff.is_fire(0.4999));
    }

    #[test]
    fn test_cutoff_range() {
        assert!(FireCutoff::new(0.0).is_some());
        assert!(FireCutoff::new(1.0).is_some());
        assert!(FireCutoff::new(1.2).is_none());
        assert!(FireCutoff::new(-0.1).is_none());
        assert!(FireCutoff::new(f64::NAN).is_none());
    }
}
