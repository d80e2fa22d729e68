//! Multilayer perceptron.
mod base;
mod config;
use crate::Activation;
use anyhow::Result;
pub use base::Mlp;
use candle_core::{Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
pub use config::MlpConfig;

/// Returns linear layers `in_dim -> units[0] -> ... -> units[n - 1]`.
///
/// Layers are named `ln0`, `ln1`, ... under `prefix`.
pub(crate) fn create_linear_layers(
    prefix: &str,
    vb: VarBuilder,
    in_dim: i64,
    units: &[i64],
) -> Result<Vec<Linear>> {
    let vb = vb.pp(prefix);
    let mut in_dim = in_dim;
    let mut layers = Vec::with_capacity(units.len());

    for (i, &out_dim) in units.iter().enumerate() {
        layers.push(linear(in_dim as _, out_dim as _, vb.pp(format!("ln{}", i)))?);
        in_dim = out_dim;
    }

    Ok(layers)
}

/// Applies `layers` with `act` after every layer but the last, and `final_act`
/// after the last one.
pub(crate) fn mlp_forward(
    xs: Tensor,
    layers: &[Linear],
    act: &Activation,
    final_act: &Activation,
) -> Result<Tensor> {
    let n_layers = layers.len();
    let mut xs = xs;

    for (i, layer) in layers.iter().enumerate() {
        xs = layer.forward(&xs)?;
        xs = match i + 1 == n_layers {
            false => act.forward(&xs)?,
            true => final_act.forward(&xs)?,
        };
    }

    Ok(xs)
}
