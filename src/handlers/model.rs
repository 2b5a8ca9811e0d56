//! Model info and hot reload

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::LayoutInfo;
use crate::model::{ModelConfig, Predictor};
use crate::{AppResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub config: ModelConfig,
    pub layout: LayoutInfo,
    pub engine: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub model_type: String,
    pub engine: String,
    pub sequence_length: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Stored model config plus the compiled feature layout
pub async fn info(State(state): State<AppState>) -> Json<ModelInfo> {
    let predictor = state.predictor();
    let status = predictor.status();

    Json(ModelInfo {
        config: predictor.config().clone(),
        layout: LayoutInfo::current(),
        engine: status.engine,
        loaded_at: status.loaded_at,
    })
}

/// Re-read the bundle from the model directory and swap it in
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<ReloadResponse>> {
    let dir = state.config.model_dir.clone();
    let gate = state.config.gate_policy();
    tracing::info!("Reloading model from {}", dir.display());

    let predictor = tokio::task::spawn_blocking(move || Predictor::load(dir, gate)).await??;
    let status = predictor.status();
    let sequence_length = predictor.config().sequence_length;
    state.replace_predictor(predictor);

    Ok(Json(ReloadResponse {
        status: "reloaded".to_string(),
        model_type: status.model_type,
        engine: status.engine,
        sequence_length,
        loaded_at: status.loaded_at,
    }))
}
