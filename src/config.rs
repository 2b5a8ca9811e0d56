//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::model::GatePolicy;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the trained model artifacts
    pub model_dir: PathBuf,

    /// Comma-separated traffic situations that open the extra lane
    pub open_lane_classes: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_dir: PathBuf::from("model"),
            open_lane_classes: "heavy,high".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),

            open_lane_classes: env::var("OPEN_LANE_CLASSES").unwrap_or(defaults.open_lane_classes),

            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy::from_list(&self.open_lane_classes)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.model_dir, PathBuf::from("model"));
        assert!(!config.is_production());

        let gate = config.gate_policy();
        assert!(gate.should_open("heavy"));
        assert!(gate.should_open("high"));
        assert!(!gate.should_open("normal"));
    }

    #[test]
    fn test_custom_gate_classes() {
        let config = Config {
            open_lane_classes: " heavy , ,normal".to_string(),
            ..Default::default()
        };
        let gate = config.gate_policy();
        assert_eq!(gate.open_classes.len(), 2);
        assert!(gate.should_open("normal"));
        assert!(!gate.should_open("high"));
    }
}
