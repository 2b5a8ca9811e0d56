//! Traffic Gate
//!
//! Classifies the traffic situation from a window of recent vehicle counts
//! and decides whether to open an extra lane.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        TRAFFIC GATE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  traffic-gate-train            traffic-gate (Axum)           │
//! │  ┌──────────────┐              ┌──────────────────────────┐  │
//! │  │ CSV → windows│              │ POST /predict            │  │
//! │  │ → features   │── model/ ──▶ │ GET  /health, /model     │  │
//! │  │ → MLP (Adam) │              │ POST /model/reload       │  │
//! │  └──────────────┘              └──────────────────────────┘  │
//! │            both share features::engineer_window              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod model;
pub mod training;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};

use model::Predictor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    predictor: Arc<RwLock<Arc<Predictor>>>,
    pub config: Config,
}

impl AppState {
    pub fn new(predictor: Predictor, config: Config) -> Self {
        Self {
            predictor: Arc::new(RwLock::new(Arc::new(predictor))),
            config,
        }
    }

    /// Current model; requests keep their snapshot across a reload
    pub fn predictor(&self) -> Arc<Predictor> {
        self.predictor.read().clone()
    }

    pub fn replace_predictor(&self, predictor: Predictor) {
        *self.predictor.write() = Arc::new(predictor);
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/model", get(handlers::model::info))
        .route("/model/reload", post(handlers::model::reload))
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
