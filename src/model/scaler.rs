//! Standard Scaler
//!
//! Per-feature standardization fit on training windows.

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRow, FEATURE_COUNT};

use super::ModelError;

/// Per-feature mean and scale: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        }
    }
}

impl StandardScaler {
    /// Fit over every row of every window
    pub fn fit<'a, I>(windows: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = &'a [FeatureRow]>,
    {
        let mut sum = [0.0f64; FEATURE_COUNT];
        let mut sum_sq = [0.0f64; FEATURE_COUNT];
        let mut n = 0usize;

        for rows in windows {
            for row in rows {
                for (i, &value) in row.iter().enumerate() {
                    let value = value as f64;
                    sum[i] += value;
                    sum_sq[i] += value * value;
                }
                n += 1;
            }
        }

        if n == 0 {
            return Err(ModelError::Invalid("cannot fit scaler on zero rows".to_string()));
        }

        let n = n as f64;
        let mut mean = Vec::with_capacity(FEATURE_COUNT);
        let mut scale = Vec::with_capacity(FEATURE_COUNT);

        for i in 0..FEATURE_COUNT {
            let m = sum[i] / n;
            let variance = (sum_sq[i] / n - m * m).max(0.0);
            let std = variance.sqrt();

            mean.push(m as f32);
            // Constant features pass through centered
            scale.push(if std < 1e-8 { 1.0 } else { std as f32 });
        }

        Ok(Self { mean, scale })
    }

    /// Check the scaler matches the feature layout width
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(ModelError::Invalid(format!(
                "scaler has {} means and {} scales, expected {}",
                self.mean.len(),
                self.scale.len(),
                FEATURE_COUNT
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ModelError::Invalid("scaler has a zero or non-finite scale".to_string()));
        }
        Ok(())
    }

    pub fn transform_row(&self, row: &FeatureRow) -> FeatureRow {
        let mut scaled = [0.0f32; FEATURE_COUNT];
        for (i, value) in row.iter().enumerate() {
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        scaled
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> Vec<FeatureRow> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(first: f32, second: f32) -> FeatureRow {
        let mut row = [5.0; FEATURE_COUNT];
        row[0] = first;
        row[1] = second;
        row
    }

    #[test]
    fn test_fit_mean_and_scale() {
        let a = vec![row(1.0, 10.0), row(3.0, 10.0)];
        let b = vec![row(5.0, 10.0)];
        let scaler = StandardScaler::fit([a.as_slice(), b.as_slice()]).unwrap();

        assert!((scaler.mean[0] - 3.0).abs() < 1e-6);
        assert!((scaler.scale[0] - (8.0f32 / 3.0).sqrt()).abs() < 1e-5);
        // Constant column
        assert_eq!(scaler.mean[1], 10.0);
        assert_eq!(scaler.scale[1], 1.0);
        assert!(scaler.validate().is_ok());
    }

    #[test]
    fn test_transform_standardizes() {
        let rows = vec![row(1.0, 0.0), row(3.0, 2.0)];
        let scaler = StandardScaler::fit([rows.as_slice()]).unwrap();
        let scaled = scaler.transform(&rows);

        assert!((scaled[0][0] + 1.0).abs() < 1e-6);
        assert!((scaled[1][0] - 1.0).abs() < 1e-6);
        assert_eq!(scaled[0][2], 0.0);
    }

    #[test]
    fn test_fit_empty_fails() {
        let empty: Vec<FeatureRow> = Vec::new();
        assert!(StandardScaler::fit([empty.as_slice()]).is_err());
    }

    #[test]
    fn test_validate_width() {
        let scaler = StandardScaler { mean: vec![0.0; 3], scale: vec![1.0; 3] };
        assert!(scaler.validate().is_err());
        assert!(StandardScaler::default().validate().is_ok());
    }
}
