//! Traffic Gate Server
//!
//! Loads the trained model bundle and serves lane-gate predictions over HTTP.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traffic_gate::model::Predictor;
use traffic_gate::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "traffic_gate=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Traffic Gate Server starting...");

    let predictor = Predictor::load(&config.model_dir, config.gate_policy())
        .with_context(|| format!("Failed to load model from {}", config.model_dir.display()))?;

    let model = predictor.config();
    tracing::info!("Model type: {}", model.model_type);
    tracing::info!("Classes: {}", predictor.classes().join(", "));
    tracing::info!("Features: {}", model.feature_names.join(", "));
    tracing::info!("Test accuracy: {:.2}%", model.test_accuracy * 100.0);
    tracing::info!(
        "Lane opens on: {}",
        predictor.gate().open_classes.iter().cloned().collect::<Vec<_>>().join(", ")
    );

    let addr = config.bind_address();
    let app = create_router(AppState::new(predictor, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
