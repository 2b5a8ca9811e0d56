//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the per-position feature schema.**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! A trained model stores the version and hash of the layout it was fit on.
//! Loading a model trained on another layout is rejected.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT
// ============================================================================

/// Feature names in exact order they appear in each position's vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Raw (0) ===
    "count",             // 0: Vehicle count at this position

    // === Time of day (1-6) ===
    "hour_sin",          // 1: sin(2π·hour/24)
    "hour_cos",          // 2: cos(2π·hour/24)
    "is_morning_rush",   // 3: 1.0 inside the morning rush window
    "is_evening_rush",   // 4: 1.0 inside the evening rush window
    "is_night",          // 5: 1.0 at night
    "is_weekend",        // 6: 1.0 on Saturday / Sunday

    // === Rolling means (7-9) ===
    "ma_2",
    "ma_4",
    "ma_8",

    // === Rolling std (10-12) ===
    "std_2",
    "std_4",
    "std_8",

    // === Differences (13-14) ===
    "diff_1",            // 13: x[t] - x[t-1]
    "diff_4",            // 14: x[t] - x[t-4]

    // === Lags (15-17) ===
    "lag_1",
    "lag_2",
    "lag_4",
];

/// Total number of features per position.
/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 18;

/// Rolling window sizes, in layout order
pub const ROLLING_WINDOWS: [usize; 3] = [2, 4, 8];

/// Lag offsets, in layout order
pub const LAGS: [usize; 3] = [1, 2, 4];

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
            feature_names: feature_names(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a stored feature layout doesn't match the compiled one
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), \
     got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that stored data matches the current layout
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if version != FEATURE_VERSION || hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: version,
            actual_hash: hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

/// Owned copy of the layout names
pub fn feature_names() -> Vec<String> {
    FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect()
}
