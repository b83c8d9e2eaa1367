//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the classifier input schema**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The classifier bundle persists its own ordered feature-name list. It is
//! checked against this layout at load time; a bundle trained on another
//! order is rejected instead of silently fed misordered values.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Environment (0-2) ===
    "temperature",    // 0: °C
    "humidity",       // 1: %RH
    "pressure",       // 2: hPa

    // === Gas (3-5) ===
    "gas_oxidising",  // 3: Ohms
    "gas_reducing",   // 4: Ohms
    "gas_nh3",        // 5: Ohms
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 6;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 of the layout (version + names in order)
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

/// Layout information for startup logging / diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Persisted feature names disagree with FEATURE_LAYOUT
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutMismatch {
    #[error("feature list has {actual} entries, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("feature #{index} is '{actual}', expected '{expected}'")]
    Name {
        index: usize,
        expected: String,
        actual: String,
    },
}

/// Check a persisted feature-name list against the layout (length, names and order)
pub fn validate_feature_names<S: AsRef<str>>(names: &[S]) -> Result<(), LayoutMismatch> {
    if names.len() != FEATURE_COUNT {
        return Err(LayoutMismatch::Length {
            expected: FEATURE_COUNT,
            actual: names.len(),
        });
    }

    for (index, (expected, actual)) in FEATURE_LAYOUT.iter().zip(names).enumerate() {
        if *expected != actual.as_ref() {
            return Err(LayoutMismatch::Name {
                index,
                expected: expected.to_string(),
                actual: actual.as_ref().to_string(),
            });
        }
    }

    Ok(())
}

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================
