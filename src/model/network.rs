//! Feed-forward classifier
//!
//! Dense ReLU hidden layers followed by a softmax output. Input is the
//! flattened standardized window (`sequence_length × FEATURE_COUNT`).

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ModelError;

/// Probability floor inside the log of the cross-entropy
const LOG_EPSILON: f32 = 1e-7;

/// One dense layer, `weights` shaped `(inputs, outputs)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl DenseLayer {
    /// He-uniform initialised layer
    pub fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / inputs as f32).sqrt();
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit)),
            bias: Array1::zeros(outputs),
        }
    }

    fn affine(&self, input: &ArrayView2<f32>) -> Array2<f32> {
        input.dot(&self.weights) + &self.bias
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<DenseLayer>,
}

/// Intermediate values of a training forward pass
pub struct ForwardCache {
    /// Input of every layer (the batch itself first)
    inputs: Vec<Array2<f32>>,
    /// Hidden pre-activations
    pre_activations: Vec<Array2<f32>>,
    /// Hidden dropout multipliers (already divided by the keep probability)
    masks: Vec<Array2<f32>>,
    pub probabilities: Array2<f32>,
}

/// Weight and bias gradients, one entry per layer
pub type Gradients = Vec<(Array2<f32>, Array1<f32>)>;

impl Network {
    pub fn new<R: Rng>(input_dim: usize, hidden: &[usize], num_classes: usize, rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut inputs = input_dim;

        for &units in hidden {
            layers.push(DenseLayer::new(inputs, units, rng));
            inputs = units;
        }
        layers.push(DenseLayer::new(inputs, num_classes, rng));

        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.weights.nrows()).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.weights.ncols()).unwrap_or(0)
    }

    pub fn hidden_sizes(&self) -> Vec<usize> {
        let hidden = self.layers.len().saturating_sub(1);
        self.layers[..hidden].iter().map(|l| l.weights.ncols()).collect()
    }

    /// Check that layer shapes chain together
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::Invalid("network has no layers".to_string()));
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.bias.len() != layer.weights.ncols() {
                return Err(ModelError::Invalid(format!(
                    "layer {i}: bias has {} entries for {} outputs",
                    layer.bias.len(),
                    layer.weights.ncols()
                )));
            }
            if let Some(next) = self.layers.get(i + 1) {
                if next.weights.nrows() != layer.weights.ncols() {
                    return Err(ModelError::Invalid(format!(
                        "layer {} expects {} inputs, layer {i} produces {}",
                        i + 1,
                        next.weights.nrows(),
                        layer.weights.ncols()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Class probabilities for a batch, one row per sample
    pub fn predict_proba(&self, batch: ArrayView2<f32>) -> Array2<f32> {
        let last = self.layers.len() - 1;
        let mut activation = batch.to_owned();

        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&activation.view());
            activation = if i == last { softmax(z) } else { z.mapv(relu) };
        }
        activation
    }

    /// Forward pass with inverted dropout on the hidden layers
    pub fn forward_train<R: Rng>(&self, batch: ArrayView2<f32>, dropout: f32, rng: &mut R) -> ForwardCache {
        let last = self.layers.len() - 1;
        let keep = 1.0 - dropout;

        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(last);
        let mut masks = Vec::with_capacity(last);
        let mut activation = batch.to_owned();

        for layer in &self.layers[..last] {
            let z = layer.affine(&activation.view());
            let mask = Array2::from_shape_fn(z.raw_dim(), |_| {
                if dropout > 0.0 && rng.gen::<f32>() < dropout { 0.0 } else { 1.0 / keep }
            });
            let next = z.mapv(relu) * &mask;

            inputs.push(activation);
            pre_activations.push(z);
            masks.push(mask);
            activation = next;
        }

        let probabilities = softmax(self.layers[last].affine(&activation.view()));
        inputs.push(activation);

        ForwardCache { inputs, pre_activations, masks, probabilities }
    }

    /// Gradients of the mean sparse categorical cross-entropy
    pub fn backward(&self, cache: &ForwardCache, labels: &[usize]) -> Gradients {
        let batch = labels.len().max(1) as f32;

        let mut delta = cache.probabilities.clone();
        for (mut row, &label) in delta.rows_mut().into_iter().zip(labels) {
            row[label] -= 1.0;
        }
        delta /= batch;

        let mut gradients: Gradients = Vec::with_capacity(self.layers.len());

        for i in (0..self.layers.len()).rev() {
            let grad_w = cache.inputs[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut upstream = delta.dot(&self.layers[i].weights.t());
                Zip::from(&mut upstream)
                    .and(&cache.pre_activations[i - 1])
                    .and(&cache.masks[i - 1])
                    .for_each(|d, &z, &m| {
                        *d = if z > 0.0 { *d * m } else { 0.0 };
                    });
                delta = upstream;
            }

            gradients.push((grad_w, grad_b));
        }

        gradients.reverse();
        gradients
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

/// Row-wise numerically stable softmax
pub fn softmax(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    logits
}

/// Mean sparse categorical cross-entropy
pub fn cross_entropy(probabilities: &Array2<f32>, labels: &[usize]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f32 = probabilities
        .rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| -(row[label].max(LOG_EPSILON)).ln())
        .sum();
    total / labels.len() as f32
}

/// Index of the largest value
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
