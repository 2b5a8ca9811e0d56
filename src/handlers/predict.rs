//! Prediction handler

use std::collections::BTreeMap;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::features::{TimeContext, TimeFlags};
use crate::model::Prediction;
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    /// Most recent vehicle counts, oldest first
    #[validate(custom(function = "validate_counts"))]
    pub counts: Vec<f32>,

    #[validate(range(max = 23))]
    pub hour: Option<u32>,

    /// Monday = 0 ... Sunday = 6
    #[validate(range(max = 6))]
    pub day_of_week: Option<u32>,
}

fn validate_counts(counts: &[f32]) -> Result<(), ValidationError> {
    if counts.iter().all(|c| c.is_finite() && *c >= 0.0) {
        Ok(())
    } else {
        Err(ValidationError::new("counts must be non-negative numbers"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictStats {
    pub avg_count: f32,
    #[serde(serialize_with = "whole_or_fraction")]
    pub min_count: f32,
    #[serde(serialize_with = "whole_or_fraction")]
    pub max_count: f32,
    pub hour: u32,
    pub day_of_week: u32,
    #[serde(flatten)]
    pub flags: TimeFlags,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    /// Percent, two decimals
    pub confidence: f32,
    pub open_lane: bool,
    pub probabilities: BTreeMap<String, f32>,
    pub timestamp: String,
    pub stats: PredictStats,
}

/// Whole counts go out as JSON integers
fn whole_or_fraction<S: serde::Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && *value >= 0.0 && *value <= u32::MAX as f32 {
        serializer.serialize_u64(*value as u64)
    } else {
        serializer.serialize_f32(*value)
    }
}

fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            confidence: round_to(p.confidence, 2),
            open_lane: p.open_lane,
            probabilities: p
                .probabilities
                .into_iter()
                .map(|(class, percent)| (class, round_to(percent, 2)))
                .collect(),
            timestamp: chrono::Local::now().to_rfc3339(),
            stats: PredictStats {
                avg_count: round_to(p.stats.avg, 1),
                min_count: p.stats.min,
                max_count: p.stats.max,
                hour: p.time.hour,
                day_of_week: p.time.day_of_week,
                flags: p.flags,
            },
            prediction: p.label,
        }
    }
}

/// Classify a window of vehicle counts and decide the gate
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let time = TimeContext::resolve(req.hour, req.day_of_week)
        .map_err(crate::model::ModelError::from)?;

    let predictor = state.predictor();
    let prediction = predictor.predict(&req.counts, time)?;

    tracing::info!(
        "Prediction: {} ({:.1}%) | Gate: {}",
        prediction.label,
        prediction.confidence,
        if prediction.open_lane { "OPEN" } else { "CLOSED" }
    );

    Ok(Json(prediction.into()))
}
