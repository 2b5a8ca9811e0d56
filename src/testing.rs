//! Shared test fixtures

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, SeedableRng};

use crate::features::{layout::feature_index, TimeWindows, FEATURE_COUNT};
use crate::model::network::DenseLayer;
use crate::model::{LabelEncoder, ModelBundle, ModelConfig, Network, StandardScaler};

pub const CLASSES: [&str; 4] = ["heavy", "high", "low", "normal"];

/// Randomly initialised bundle over the four traffic classes
pub fn sample_bundle(sequence_length: usize) -> ModelBundle {
    let mut rng = StdRng::seed_from_u64(42);
    let labels = LabelEncoder::fit(CLASSES).unwrap();
    let config = ModelConfig::new(sequence_length, vec![8], labels.len(), TimeWindows::default());
    let network = Network::new(config.input_dim(), &[8], labels.len(), &mut rng);

    ModelBundle {
        config,
        scaler: StandardScaler::default(),
        labels,
        network,
    }
}

/// Single-layer bundle that predicts "heavy" when the window sum exceeds 60
/// and "low" below 10
pub fn threshold_bundle(sequence_length: usize) -> ModelBundle {
    let labels = LabelEncoder::fit(CLASSES).unwrap();
    let config = ModelConfig::new(sequence_length, vec![], labels.len(), TimeWindows::default());
    let count = feature_index("count").unwrap();

    let mut weights = Array2::<f32>::zeros((config.input_dim(), labels.len()));
    for position in 0..sequence_length {
        weights[[position * FEATURE_COUNT + count, 0]] = 0.1;
        weights[[position * FEATURE_COUNT + count, 2]] = -0.1;
    }
    let bias = Array1::from(vec![-5.0, 0.0, 1.0, 0.0]);

    ModelBundle {
        config,
        scaler: StandardScaler::default(),
        labels,
        network: Network { layers: vec![DenseLayer { weights, bias }] },
    }
}
