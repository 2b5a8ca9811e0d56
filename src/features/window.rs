//! Window Feature Engineering
//!
//! Turns an ordered window of vehicle counts plus a time context into one
//! feature row per position, in the order defined by `layout.rs`.
//!
//! Lookback features (rolling stats, differences, lags) treat every position
//! before the start of the window as holding the first observed count.

use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, LAGS,
    ROLLING_WINDOWS,
};
use super::time::{indicator, TimeContext, TimeWindows};
use super::FeatureError;

/// Feature values of one window position
pub type FeatureRow = [f32; FEATURE_COUNT];

// ============================================================================
// FEATURE WINDOW
// ============================================================================

/// Engineered rows of a window, tagged with the layout they were built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWindow {
    pub version: u8,
    pub layout_hash: u32,
    pub rows: Vec<FeatureRow>,
}

impl FeatureWindow {
    pub fn from_rows(rows: Vec<FeatureRow>) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature value by position and name
    pub fn get_by_name(&self, position: usize, name: &str) -> Option<f32> {
        let index = feature_index(name)?;
        self.rows.get(position).map(|row| row[index])
    }

    /// Row-major flat copy (`len × FEATURE_COUNT`)
    pub fn flatten(&self) -> Vec<f32> {
        self.rows.iter().flat_map(|row| row.iter().copied()).collect()
    }

    /// Named values of the most recent position, for debug logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        let last = self.rows.last().copied().unwrap_or([0.0; FEATURE_COUNT]);
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "positions": self.rows.len(),
            "last": FEATURE_LAYOUT.iter()
                .zip(last.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Fills part of a row for one position of a count series
pub trait FeatureExtractor {
    fn extract(&self, series: &[f32], position: usize, row: &mut FeatureRow);
}

/// Count at `position - offset`, or the first count before the series start
fn lookback(series: &[f32], position: usize, offset: usize) -> f32 {
    series[position.saturating_sub(offset)]
}

struct RawCount;

impl FeatureExtractor for RawCount {
    fn extract(&self, series: &[f32], position: usize, row: &mut FeatureRow) {
        row[0] = series[position];
    }
}

/// Time features are identical at every position of a window
struct TimeFeatures {
    values: [f32; 6],
}

impl TimeFeatures {
    fn new(time: &TimeContext, windows: &TimeWindows) -> Self {
        let flags = windows.flags(time);
        Self {
            values: [
                time.hour_sin(),
                time.hour_cos(),
                indicator(flags.is_morning_rush),
                indicator(flags.is_evening_rush),
                indicator(flags.is_night),
                indicator(flags.is_weekend),
            ],
        }
    }
}

impl FeatureExtractor for TimeFeatures {
    fn extract(&self, _series: &[f32], _position: usize, row: &mut FeatureRow) {
        row[1..7].copy_from_slice(&self.values);
    }
}

struct RollingStats;

impl FeatureExtractor for RollingStats {
    fn extract(&self, series: &[f32], position: usize, row: &mut FeatureRow) {
        for (slot, &size) in ROLLING_WINDOWS.iter().enumerate() {
            let (mean, std) = rolling_mean_std(series, position, size);
            row[7 + slot] = mean;
            row[10 + slot] = std;
        }
    }
}

/// Mean and population std of the `size` counts ending at `position`
pub fn rolling_mean_std(series: &[f32], position: usize, size: usize) -> (f32, f32) {
    let n = size as f64;
    let values = (0..size).map(|back| lookback(series, position, back) as f64);

    // f64 keeps sums of large counts finite
    let mean = values.clone().sum::<f64>() / n;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    (mean as f32, variance.sqrt() as f32)
}

struct Differences;

impl FeatureExtractor for Differences {
    fn extract(&self, series: &[f32], position: usize, row: &mut FeatureRow) {
        let current = series[position];
        row[13] = current - lookback(series, position, 1);
        row[14] = current - lookback(series, position, 4);
    }
}

struct Lags;

impl FeatureExtractor for Lags {
    fn extract(&self, series: &[f32], position: usize, row: &mut FeatureRow) {
        for (slot, &lag) in LAGS.iter().enumerate() {
            row[15 + slot] = lookback(series, position, lag);
        }
    }
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// Engineer one feature row per window position
pub fn engineer_window(
    counts: &[f32],
    time: &TimeContext,
    windows: &TimeWindows,
) -> Result<FeatureWindow, FeatureError> {
    if counts.is_empty() {
        return Err(FeatureError::EmptyWindow);
    }
    if let Some(position) = counts.iter().position(|c| !c.is_finite()) {
        return Err(FeatureError::NonFiniteCount(position));
    }

    let time_features = TimeFeatures::new(time, windows);
    let extractors: [&dyn FeatureExtractor; 5] =
        [&RawCount, &time_features, &RollingStats, &Differences, &Lags];

    let rows = (0..counts.len())
        .map(|position| {
            let mut row = [0.0f32; FEATURE_COUNT];
            for extractor in &extractors {
                extractor.extract(counts, position, &mut row);
            }
            row
        })
        .collect();

    Ok(FeatureWindow::from_rows(rows))
}

/// Summary of the raw counts of a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub avg: f32,
    pub min: f32,
    pub max: f32,
}

impl WindowStats {
    pub fn from_counts(counts: &[f32]) -> Option<Self> {
        if counts.is_empty() {
            return None;
        }
        let sum: f64 = counts.iter().map(|&c| c as f64).sum();
        let min = counts.iter().copied().fold(f32::INFINITY, f32::min);
        let max = counts.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        Some(Self {
            avg: (sum / counts.len() as f64) as f32,
            min,
            max,
        })
    }
}
