//! Mini-batch training loop
//!
//! Adam on sparse categorical cross-entropy with dropout, early stopping on
//! validation loss, learning-rate reduction on plateau, and a checkpoint of
//! the weights with the best validation accuracy.

use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::network::{argmax, cross_entropy, Network};

use super::optimizer::Adam;
use super::TrainingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub hidden_sizes: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub dropout: f32,
    /// Epochs without validation-loss improvement before stopping
    pub early_stopping_patience: usize,
    /// Epochs without validation-loss improvement before halving the rate
    pub lr_patience: usize,
    pub lr_factor: f32,
    pub min_learning_rate: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![64, 32],
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.001,
            dropout: 0.3,
            early_stopping_patience: 10,
            lr_patience: 5,
            lr_factor: 0.5,
            min_learning_rate: 1e-6,
        }
    }
}

/// Flattened standardized windows and their class indices
#[derive(Debug, Clone)]
pub struct Dataset {
    pub inputs: Array2<f32>,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: f32,
    pub val_accuracy: f32,
    pub learning_rate: f32,
}

pub struct TrainOutcome {
    /// Weights of the best validation-accuracy epoch
    pub network: Network,
    pub best_epoch: usize,
    pub history: Vec<EpochStats>,
    pub stopped_early: bool,
}

/// Loss, accuracy and predicted classes of a network on a dataset
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
    pub predictions: Vec<usize>,
}

pub fn evaluate(network: &Network, data: &Dataset) -> Evaluation {
    if data.is_empty() {
        return Evaluation { loss: 0.0, accuracy: 0.0, predictions: Vec::new() };
    }

    let probabilities = network.predict_proba(data.inputs.view());
    let predictions: Vec<usize> = probabilities
        .rows()
        .into_iter()
        .map(|row| argmax(&row.to_vec()).unwrap_or(0))
        .collect();
    let correct = predictions.iter().zip(&data.labels).filter(|(p, t)| p == t).count();

    Evaluation {
        loss: cross_entropy(&probabilities, &data.labels),
        accuracy: correct as f32 / data.len() as f32,
        predictions,
    }
}

pub fn train<R: Rng>(
    train_set: &Dataset,
    validation: &Dataset,
    num_classes: usize,
    config: &TrainerConfig,
    rng: &mut R,
) -> Result<TrainOutcome, TrainingError> {
    if train_set.is_empty() {
        return Err(TrainingError::NotEnoughData("training split is empty".to_string()));
    }
    if validation.is_empty() {
        return Err(TrainingError::NotEnoughData("validation split is empty".to_string()));
    }
    if config.batch_size == 0 || config.epochs == 0 {
        return Err(TrainingError::Config("epochs and batch_size must be positive".to_string()));
    }
    if !(0.0..1.0).contains(&config.dropout) {
        return Err(TrainingError::Config(format!("dropout {} outside [0, 1)", config.dropout)));
    }

    let mut network = Network::new(train_set.inputs.ncols(), &config.hidden_sizes, num_classes, rng);
    let mut optimizer = Adam::new(&network, config.learning_rate);

    let mut checkpoint = network.clone();
    let mut best_epoch = 0;
    let mut best_val_accuracy = f32::NEG_INFINITY;
    let mut best_val_loss = f32::INFINITY;
    let mut epochs_since_improvement = 0;
    let mut epochs_since_lr_change = 0;

    let mut history = Vec::with_capacity(config.epochs);
    let mut order: Vec<usize> = (0..train_set.len()).collect();
    let mut stopped_early = false;

    for epoch in 1..=config.epochs {
        order.shuffle(rng);

        let mut loss_sum = 0.0f32;
        let mut correct = 0usize;

        for batch in order.chunks(config.batch_size) {
            let inputs = train_set.inputs.select(Axis(0), batch);
            let labels: Vec<usize> = batch.iter().map(|&i| train_set.labels[i]).collect();

            let cache = network.forward_train(inputs.view(), config.dropout, rng);
            loss_sum += cross_entropy(&cache.probabilities, &labels) * batch.len() as f32;
            correct += cache
                .probabilities
                .rows()
                .into_iter()
                .zip(&labels)
                .filter(|(row, &label)| argmax(&row.to_vec()) == Some(label))
                .count();

            let gradients = network.backward(&cache, &labels);
            optimizer.apply(&mut network, &gradients);
        }

        let val = evaluate(&network, validation);
        let stats = EpochStats {
            epoch,
            loss: loss_sum / train_set.len() as f32,
            accuracy: correct as f32 / train_set.len() as f32,
            val_loss: val.loss,
            val_accuracy: val.accuracy,
            learning_rate: optimizer.learning_rate,
        };
        tracing::debug!(
            "Epoch {}/{}: loss={:.4} acc={:.4} val_loss={:.4} val_acc={:.4} lr={:.2e}",
            epoch, config.epochs, stats.loss, stats.accuracy, stats.val_loss, stats.val_accuracy, stats.learning_rate
        );
        history.push(stats);

        if val.accuracy > best_val_accuracy {
            best_val_accuracy = val.accuracy;
            best_epoch = epoch;
            checkpoint = network.clone();
        }

        if val.loss < best_val_loss {
            best_val_loss = val.loss;
            epochs_since_improvement = 0;
            epochs_since_lr_change = 0;
        } else {
            epochs_since_improvement += 1;
            epochs_since_lr_change += 1;
        }

        if epochs_since_lr_change >= config.lr_patience && optimizer.learning_rate > config.min_learning_rate {
            optimizer.learning_rate = (optimizer.learning_rate * config.lr_factor).max(config.min_learning_rate);
            epochs_since_lr_change = 0;
            tracing::debug!("Reducing learning rate to {:.2e}", optimizer.learning_rate);
        }

        if epochs_since_improvement >= config.early_stopping_patience {
            tracing::info!("Early stopping at epoch {}", epoch);
            stopped_early = true;
            break;
        }
    }

    tracing::info!(
        "Best validation accuracy {:.4} at epoch {}",
        best_val_accuracy,
        best_epoch
    );

    Ok(TrainOutcome {
        network: checkpoint,
        best_epoch,
        history,
        stopped_early,
    })
}
