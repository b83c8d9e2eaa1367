//! Features Module - Sensor readings and classifier input layout

pub mod layout;
pub mod reading;

pub use layout::{
    layout_hash, validate_feature_names, LayoutInfo, LayoutMismatch, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_VERSION,
};
pub use reading::{unix_now, FeatureVector, Reading, ReadingValues};
