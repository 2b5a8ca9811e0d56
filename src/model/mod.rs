//! Model Module - Artifacts and Inference Engine
//!
//! Everything produced by training and consumed by the server:
//! scaler, label encoder, network weights and model config.

pub mod artifacts;
pub mod inference;
pub mod labels;
pub mod network;
pub mod scaler;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use artifacts::{ModelBundle, ModelConfig};
pub use inference::{GatePolicy, InferenceEngine, NativeEngine, Prediction, Predictor, PredictorStatus};
pub use labels::LabelEncoder;
pub use network::Network;
pub use scaler::StandardScaler;

use crate::features::{layout::LayoutMismatchError, FeatureError};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("expected {expected} vehicle counts, got {actual}")]
    WindowLength { expected: usize, actual: usize },

    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("class index {0} out of range for {1} classes")]
    ClassOutOfRange(usize, usize),

    #[error("inference failed: {0}")]
    Inference(String),
}
