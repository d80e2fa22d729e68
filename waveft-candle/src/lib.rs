//! Dual-branch Gaussian policy implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The policy consumes flat states made of a kinematic slice and a time series
//! of force/torque readings (see [`waveft_core::StateLayout`]). The two parts
//! are encoded by an [`mlp::Mlp`] and a [`tcn::Tcn`], fused by
//! [`policy::WaveFtNet`] and turned into a [`dist::DiagonalGaussian`] by
//! [`policy::GaussianPolicy`].
pub mod dist;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod policy;
pub mod ppo;
pub mod squash;
pub mod tcn;
pub mod util;
use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Activation functions of hidden layers.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum Activation {
    /// Identity.
    None,

    /// Rectified linear unit.
    ReLU,

    /// Hyperbolic tangent.
    Tanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::ReLU
    }
}

impl Activation {
    /// Applies the activation function.
    pub fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::None => Ok(xs.clone()),
            Self::ReLU => xs.relu(),
            Self::Tanh => xs.tanh(),
        }
    }
}
