//! Inference Engine
//!
//! Runs a loaded model on a window of counts: feature engineering,
//! standardization, network forward pass, label decoding and gate decision.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::features::{engineer_window, FeatureRow, TimeContext, TimeFlags, WindowStats};

use super::network::argmax;
use super::{ModelBundle, ModelConfig, ModelError, Network};

// ============================================================================
// INFERENCE ENGINE TRAIT
// ============================================================================

/// Backend producing class probabilities from a standardized window
pub trait InferenceEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn predict_proba(&self, window: &[FeatureRow]) -> Result<Vec<f32>, ModelError>;
}

/// Runs the JSON network weights in-process
pub struct NativeEngine {
    network: Network,
}

impl NativeEngine {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

impl InferenceEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn predict_proba(&self, window: &[FeatureRow]) -> Result<Vec<f32>, ModelError> {
        let flat: Vec<f32> = window.iter().flat_map(|row| row.iter().copied()).collect();
        if flat.len() != self.network.input_dim() {
            return Err(ModelError::Inference(format!(
                "network takes {} inputs, got {}",
                self.network.input_dim(),
                flat.len()
            )));
        }

        let input = Array2::from_shape_vec((1, flat.len()), flat)
            .map_err(|e| ModelError::Inference(format!("array error: {}", e)))?;
        let probabilities = self.network.predict_proba(input.view());

        Ok(probabilities.row(0).to_vec())
    }
}

// ============================================================================
// GATE POLICY
// ============================================================================

/// Traffic situations that open the extra lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub open_classes: BTreeSet<String>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from_list("heavy,high")
    }
}

impl GatePolicy {
    /// Parse a comma-separated class list
    pub fn from_list(list: &str) -> Self {
        Self {
            open_classes: list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn should_open(&self, label: &str) -> bool {
        self.open_classes.contains(label)
    }
}

// ============================================================================
// PREDICTOR
// ============================================================================

/// Result of classifying one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub class_index: usize,
    /// Probability of the predicted class, in percent
    pub confidence: f32,
    /// Probability of every class, in percent
    pub probabilities: BTreeMap<String, f32>,
    pub open_lane: bool,
    pub time: TimeContext,
    pub flags: TimeFlags,
    pub stats: WindowStats,
    pub inference_time_us: u64,
}

/// Predictor status for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorStatus {
    pub model_type: String,
    pub engine: String,
    pub loaded_at: DateTime<Utc>,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

/// A loaded model ready to classify windows
pub struct Predictor {
    bundle: ModelBundle,
    engine: Box<dyn InferenceEngine>,
    gate: GatePolicy,
    loaded_at: DateTime<Utc>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl Predictor {
    pub fn new(bundle: ModelBundle, gate: GatePolicy) -> Self {
        let engine = Box::new(NativeEngine::new(bundle.network.clone()));
        Self::with_engine(bundle, engine, gate)
    }

    pub fn with_engine(bundle: ModelBundle, engine: Box<dyn InferenceEngine>, gate: GatePolicy) -> Self {
        Self {
            bundle,
            engine,
            gate,
            loaded_at: Utc::now(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Load artifacts from a model directory and pick the engine
    pub fn load(dir: impl AsRef<Path>, gate: GatePolicy) -> Result<Self, ModelError> {
        let dir = dir.as_ref();
        let bundle = ModelBundle::load(dir)?;

        for class in &gate.open_classes {
            if bundle.labels.encode(class).is_err() {
                tracing::warn!("Gate class '{}' is not a model class", class);
            }
        }

        let engine = engine_for(dir, &bundle)?;
        tracing::info!(
            "Model loaded: {} ({} engine, {} classes, window {})",
            bundle.config.model_type,
            engine.name(),
            bundle.labels.len(),
            bundle.config.sequence_length
        );

        Ok(Self::with_engine(bundle, engine, gate))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.bundle.config
    }

    pub fn classes(&self) -> &[String] {
        &self.bundle.labels.classes
    }

    pub fn gate(&self) -> &GatePolicy {
        &self.gate
    }

    /// Classify a window of counts at the given time
    pub fn predict(&self, counts: &[f32], time: TimeContext) -> Result<Prediction, ModelError> {
        let start_time = Instant::now();
        let config = &self.bundle.config;

        if counts.len() != config.sequence_length {
            return Err(ModelError::WindowLength {
                expected: config.sequence_length,
                actual: counts.len(),
            });
        }

        let features = engineer_window(counts, &time, &config.time_windows)?;
        tracing::trace!(features = %features.to_log_entry(), "Engineered window");

        let scaled = self.bundle.scaler.transform(&features.rows);
        let probabilities = self.engine.predict_proba(&scaled)?;

        if probabilities.len() != self.bundle.labels.len() {
            return Err(ModelError::Inference(format!(
                "engine returned {} probabilities for {} classes",
                probabilities.len(),
                self.bundle.labels.len()
            )));
        }

        if let Some(class) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(ModelError::Inference(format!(
                "non-finite probability for class {}",
                class
            )));
        }

        let class_index = argmax(&probabilities)
            .ok_or_else(|| ModelError::Inference("empty output".to_string()))?;
        let label = self.bundle.labels.decode(class_index)?.to_string();
        let stats = WindowStats::from_counts(counts)
            .ok_or(ModelError::Feature(crate::features::FeatureError::EmptyWindow))?;

        let inference_time_us = start_time.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(inference_time_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Ok(Prediction {
            open_lane: self.gate.should_open(&label),
            confidence: probabilities[class_index] * 100.0,
            probabilities: self
                .bundle
                .labels
                .classes
                .iter()
                .cloned()
                .zip(probabilities.iter().map(|p| p * 100.0))
                .collect(),
            label,
            class_index,
            flags: config.time_windows.flags(&time),
            time,
            stats,
            inference_time_us,
        })
    }

    pub fn status(&self) -> PredictorStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        PredictorStatus {
            model_type: self.bundle.config.model_type.clone(),
            engine: self.engine.name().to_string(),
            loaded_at: self.loaded_at,
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

fn engine_for(dir: &Path, bundle: &ModelBundle) -> Result<Box<dyn InferenceEngine>, ModelError> {
    if let Some(file) = &bundle.config.onnx_model {
        #[cfg(feature = "onnx")]
        {
            let engine = super::onnx::OnnxEngine::load(&dir.join(file), bundle.config.sequence_length)?;
            return Ok(Box::new(engine));
        }

        #[cfg(not(feature = "onnx"))]
        tracing::warn!(
            "{} requested but built without the `onnx` feature, serving native weights",
            dir.join(file).display()
        );
    }

    Ok(Box::new(NativeEngine::new(bundle.network.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_bundle;

    struct FixedEngine(Vec<f32>);

    impl InferenceEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn predict_proba(&self, _window: &[FeatureRow]) -> Result<Vec<f32>, ModelError> {
            Ok(self.0.clone())
        }
    }

    fn time() -> TimeContext {
        TimeContext::new(8, 1).unwrap()
    }

    #[test]
    fn test_gate_policy() {
        let gate = GatePolicy::default();
        assert!(gate.should_open("heavy"));
        assert!(gate.should_open("high"));
        assert!(!gate.should_open("normal"));
        assert!(!gate.should_open("low"));

        let custom = GatePolicy::from_list(" heavy , ,jam");
        assert_eq!(custom.open_classes.len(), 2);
        assert!(custom.should_open("jam"));
    }

    #[test]
    fn test_native_probabilities_sum_to_one() {
        let predictor = Predictor::new(sample_bundle(12), GatePolicy::default());
        let prediction = predictor.predict(&[20.0; 12], time()).unwrap();

        let total: f32 = prediction.probabilities.values().sum();
        assert!((total - 100.0).abs() < 1e-3);
        assert_eq!(prediction.probabilities.len(), 4);
        assert_eq!(prediction.confidence, prediction.probabilities[&prediction.label]);
    }

    #[test]
    fn test_prediction_decodes_argmax_and_gate() {
        let predictor = Predictor::with_engine(
            sample_bundle(12),
            Box::new(FixedEngine(vec![0.1, 0.7, 0.1, 0.1])),
            GatePolicy::default(),
        );
        let prediction = predictor.predict(&[30.0; 12], time()).unwrap();

        assert_eq!(prediction.label, "high");
        assert_eq!(prediction.class_index, 1);
        assert!((prediction.confidence - 70.0).abs() < 1e-4);
        assert!(prediction.open_lane);
        assert!(prediction.flags.is_morning_rush);
        assert_eq!(prediction.stats.avg, 30.0);
    }

    #[test]
    fn test_closed_gate_for_low_traffic() {
        let predictor = Predictor::with_engine(
            sample_bundle(12),
            Box::new(FixedEngine(vec![0.0, 0.1, 0.8, 0.1])),
            GatePolicy::default(),
        );
        let prediction = predictor.predict(&[2.0; 12], time()).unwrap();
        assert_eq!(prediction.label, "low");
        assert!(!prediction.open_lane);
    }

    #[test]
    fn test_wrong_window_length() {
        let predictor = Predictor::new(sample_bundle(12), GatePolicy::default());
        let err = predictor.predict(&[1.0; 11], time()).unwrap_err();
        assert!(matches!(err, ModelError::WindowLength { expected: 12, actual: 11 }));
    }

    #[test]
    fn test_engine_output_width_checked() {
        let predictor = Predictor::with_engine(
            sample_bundle(12),
            Box::new(FixedEngine(vec![1.0])),
            GatePolicy::default(),
        );
        assert!(matches!(
            predictor.predict(&[1.0; 12], time()),
            Err(ModelError::Inference(_))
        ));
    }

    #[test]
    fn test_non_finite_engine_output_rejected() {
        let predictor = Predictor::with_engine(
            sample_bundle(12),
            Box::new(FixedEngine(vec![f32::NAN, 0.2, 0.2, 0.2])),
            GatePolicy::default(),
        );
        assert!(matches!(
            predictor.predict(&[1.0; 12], time()),
            Err(ModelError::Inference(_))
        ));
        assert_eq!(predictor.status().inference_count, 0);
    }

    #[test]
    fn test_status_counts_inferences() {
        let predictor = Predictor::new(sample_bundle(12), GatePolicy::default());
        assert_eq!(predictor.status().inference_count, 0);

        predictor.predict(&[10.0; 12], time()).unwrap();
        predictor.predict(&[10.0; 12], time()).unwrap();

        let status = predictor.status();
        assert_eq!(status.inference_count, 2);
        assert_eq!(status.engine, "native");
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        sample_bundle(12).save(dir.path()).unwrap();

        let predictor = Predictor::load(dir.path(), GatePolicy::default()).unwrap();
        assert_eq!(predictor.config().sequence_length, 12);
        assert_eq!(predictor.classes().len(), 4);
    }
}
