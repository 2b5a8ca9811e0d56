//! ONNX Runtime engine
//!
//! Serves an exported model taking a `(1, sequence_length, FEATURE_COUNT)`
//! tensor and returning class probabilities.

use std::path::Path;

use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use crate::features::{FeatureRow, FEATURE_COUNT};

use super::inference::InferenceEngine;
use super::ModelError;

pub struct OnnxEngine {
    session: Mutex<Session>,
    output_name: String,
    sequence_length: usize,
}

impl OnnxEngine {
    pub fn load(model_path: &Path, sequence_length: usize) -> Result<Self, ModelError> {
        tracing::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ModelError::Invalid(format!("ONNX model not found: {}", model_path.display())));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::Inference(format!("failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::Inference(format!("failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ModelError::Inference(format!("failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelError::Inference("no output defined".to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            sequence_length,
        })
    }
}

impl InferenceEngine for OnnxEngine {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn predict_proba(&self, window: &[FeatureRow]) -> Result<Vec<f32>, ModelError> {
        if window.len() != self.sequence_length {
            return Err(ModelError::WindowLength {
                expected: self.sequence_length,
                actual: window.len(),
            });
        }

        let input_data: Vec<f32> = window.iter().flat_map(|row| row.iter().copied()).collect();
        let input_array = Array3::<f32>::from_shape_vec((1, window.len(), FEATURE_COUNT), input_data)
            .map_err(|e| ModelError::Inference(format!("array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| ModelError::Inference(format!("tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ModelError::Inference(format!("inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| ModelError::Inference("no output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(format!("extract error: {}", e)))?;

        Ok(data.to_vec())
    }
}
