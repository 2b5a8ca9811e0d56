//! Health check handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
    pub model_type: String,
    pub engine: String,
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub sequence_length: usize,
    pub test_accuracy: f32,
    pub open_lane_classes: Vec<String>,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let predictor = state.predictor();
    let config = predictor.config();
    let status = predictor.status();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        model_type: status.model_type,
        engine: status.engine,
        classes: predictor.classes().to_vec(),
        features: config.feature_names.clone(),
        sequence_length: config.sequence_length,
        test_accuracy: config.test_accuracy,
        open_lane_classes: predictor.gate().open_classes.iter().cloned().collect(),
        inference_count: status.inference_count,
        avg_latency_ms: status.avg_latency_ms,
    })
}
