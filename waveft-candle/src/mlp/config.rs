use crate::{util::OutDim, Activation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: i64,
    pub(super) units: Vec<i64>,
    pub(super) out_dim: i64,
    pub(super) activation_out: bool,
    #[serde(default)]
    pub(super) activation: Activation,
}

impl MlpConfig {
    /// Creates configuration of MLP with ReLU hidden activations.
    ///
    /// * `activation_out` - If `true`, activation function is added in the final layer.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
            activation: Activation::ReLU,
        }
    }

    /// Sets the activation function of hidden layers.
    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = v;
        self
    }

    /// Returns the input dimension.
    pub fn get_in_dim(&self) -> i64 {
        self.in_dim
    }

    /// Sets the input dimension.
    pub fn set_in_dim(&mut self, v: i64) {
        self.in_dim = v;
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: i64) {
        self.out_dim = out_dim;
    }
}
