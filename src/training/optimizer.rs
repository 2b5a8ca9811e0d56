//! Adam optimizer over the network parameters

use ndarray::{Array, Array1, Array2, Dimension, Zip};

use crate::model::network::{Gradients, Network};

pub const BETA1: f32 = 0.9;
pub const BETA2: f32 = 0.999;
pub const EPSILON: f32 = 1e-7;

pub struct Adam {
    pub learning_rate: f32,
    step: i32,
    /// First and second moments, shaped like each layer's (weights, bias)
    moments: Vec<(Array2<f32>, Array1<f32>)>,
    velocities: Vec<(Array2<f32>, Array1<f32>)>,
}

impl Adam {
    pub fn new(network: &Network, learning_rate: f32) -> Self {
        let zeros: Vec<_> = network
            .layers
            .iter()
            .map(|l| (Array2::zeros(l.weights.raw_dim()), Array1::zeros(l.bias.raw_dim())))
            .collect();

        Self {
            learning_rate,
            step: 0,
            moments: zeros.clone(),
            velocities: zeros,
        }
    }

    pub fn apply(&mut self, network: &mut Network, gradients: &Gradients) {
        self.step += 1;
        let correction = (1.0 - BETA2.powi(self.step)).sqrt() / (1.0 - BETA1.powi(self.step));
        let lr = self.learning_rate * correction;

        for (i, layer) in network.layers.iter_mut().enumerate() {
            let (grad_w, grad_b) = &gradients[i];
            let (m_w, m_b) = &mut self.moments[i];
            let (v_w, v_b) = &mut self.velocities[i];

            update(&mut layer.weights, m_w, v_w, grad_w, lr);
            update(&mut layer.bias, m_b, v_b, grad_b, lr);
        }
    }
}

fn update<D: Dimension>(
    param: &mut Array<f32, D>,
    moment: &mut Array<f32, D>,
    velocity: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    lr: f32,
) {
    Zip::from(param)
        .and(moment)
        .and(velocity)
        .and(grad)
        .for_each(|p, m, v, &g| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= lr * *m / (v.sqrt() + EPSILON);
        });
}
