//! Model Artifacts
//!
//! A trained model is a directory of JSON files:
//!
//! ```text
//! model/
//! ├── config.json   ModelConfig
//! ├── model.json    Network weights
//! ├── scaler.json   StandardScaler
//! └── labels.json   LabelEncoder
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::features::layout::{feature_names, layout_hash, validate_layout, FEATURE_COUNT, FEATURE_VERSION};
use crate::features::TimeWindows;

use super::{LabelEncoder, ModelError, Network, StandardScaler};

pub const CONFIG_FILE: &str = "config.json";
pub const NETWORK_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const LABELS_FILE: &str = "labels.json";

/// Number of counts per request window
pub const DEFAULT_SEQUENCE_LENGTH: usize = 12;

pub const MODEL_TYPE: &str = "TrafficMLP";

/// Metadata written next to the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: String,
    pub sequence_length: usize,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_names: Vec<String>,
    pub hidden_sizes: Vec<usize>,
    pub num_classes: usize,
    pub time_windows: TimeWindows,
    pub test_accuracy: f32,
    pub trained_at: DateTime<Utc>,
    /// ONNX file in the same directory, served instead of `model.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onnx_model: Option<String>,
}

impl ModelConfig {
    pub fn new(sequence_length: usize, hidden_sizes: Vec<usize>, num_classes: usize, time_windows: TimeWindows) -> Self {
        Self {
            model_type: MODEL_TYPE.to_string(),
            sequence_length,
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            feature_names: feature_names(),
            hidden_sizes,
            num_classes,
            time_windows,
            test_accuracy: 0.0,
            trained_at: Utc::now(),
            onnx_model: None,
        }
    }

    /// Width of the flattened network input
    pub fn input_dim(&self) -> usize {
        self.sequence_length * FEATURE_COUNT
    }
}

/// All artifacts needed to serve predictions
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub config: ModelConfig,
    pub scaler: StandardScaler,
    pub labels: LabelEncoder,
    pub network: Network,
}

impl ModelBundle {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        let dir = dir.as_ref();
        tracing::info!("Loading model artifacts from: {}", dir.display());

        let bundle = Self {
            config: read_json(&dir.join(CONFIG_FILE))?,
            scaler: read_json(&dir.join(SCALER_FILE))?,
            labels: read_json(&dir.join(LABELS_FILE))?,
            network: read_json(&dir.join(NETWORK_FILE))?,
        };
        bundle.validate()?;

        Ok(bundle)
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), ModelError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ModelError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        write_json(&dir.join(CONFIG_FILE), &self.config)?;
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(LABELS_FILE), &self.labels)?;
        write_json(&dir.join(NETWORK_FILE), &self.network)?;

        tracing::info!("Model artifacts saved to: {}", dir.display());
        Ok(())
    }

    /// Cross-check every artifact against the others and the compiled layout
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_layout(self.config.feature_version, self.config.layout_hash)?;
        self.scaler.validate()?;
        self.network.validate()?;

        if self.config.sequence_length == 0 {
            return Err(ModelError::Invalid("sequence_length must be positive".to_string()));
        }
        self.config
            .time_windows
            .validate()
            .map_err(|e| ModelError::Invalid(format!("time windows: {}", e)))?;
        if self.network.hidden_sizes() != self.config.hidden_sizes {
            return Err(ModelError::Invalid(format!(
                "network hidden layers {:?} do not match config {:?}",
                self.network.hidden_sizes(),
                self.config.hidden_sizes
            )));
        }
        if self.network.input_dim() != self.config.input_dim() {
            return Err(ModelError::Invalid(format!(
                "network takes {} inputs, config implies {} ({} × {})",
                self.network.input_dim(),
                self.config.input_dim(),
                self.config.sequence_length,
                FEATURE_COUNT
            )));
        }
        if self.labels.len() != self.config.num_classes || self.network.output_dim() != self.labels.len() {
            return Err(ModelError::Invalid(format!(
                "class count mismatch: config {}, labels {}, network {}",
                self.config.num_classes,
                self.labels.len(),
                self.network.output_dim()
            )));
        }
        Ok(())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ModelError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_bundle;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = sample_bundle(4);

        bundle.save(dir.path()).unwrap();
        for file in [CONFIG_FILE, NETWORK_FILE, SCALER_FILE, LABELS_FILE] {
            assert!(dir.path().join(file).exists(), "{file}");
        }

        let loaded = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(loaded.config.sequence_length, 4);
        assert_eq!(loaded.labels, bundle.labels);
        assert_eq!(loaded.network.input_dim(), 4 * FEATURE_COUNT);
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelBundle::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn test_layout_mismatch_rejected() {
        let mut bundle = sample_bundle(4);
        bundle.config.layout_hash ^= 0xffff;
        assert!(matches!(bundle.validate(), Err(ModelError::Layout(_))));
    }

    #[test]
    fn test_input_width_mismatch_rejected() {
        let mut bundle = sample_bundle(4);
        bundle.config.sequence_length = 5;
        assert!(matches!(bundle.validate(), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn test_hidden_layers_mismatch_rejected() {
        let mut bundle = sample_bundle(4);
        bundle.config.hidden_sizes = vec![16];
        let err = bundle.validate().unwrap_err();
        assert!(err.to_string().contains("hidden layers"), "{err}");
    }

    #[test]
    fn test_out_of_range_time_window_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = sample_bundle(4);
        bundle.config.time_windows.night_start = 24;
        bundle.save(dir.path()).unwrap();

        let err = ModelBundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
        assert!(err.to_string().contains("time windows"), "{err}");
    }

    #[test]
    fn test_class_count_mismatch_rejected() {
        let mut bundle = sample_bundle(4);
        bundle.config.num_classes = 3;
        assert!(bundle.validate().is_err());
    }
}
