//! Bounded actions via `tanh` and the log-probability correction.
//!
//! If `u ~ π(u|s)` and `a = tanh(u)`, then
//! `log π(a|s) = log π(u|s) - Σ ln(1 - tanh(u)²)`.
use anyhow::Result;
use candle_core::{Tensor, D};

/// Added inside the logarithm of the correction, and used as the margin when
/// inverting squashed actions.
pub const EPS: f64 = 1e-6;

/// Subtracts the log-determinant of the `tanh` Jacobian from `logp`.
///
/// `actions` are the squashed values in `(-1, 1)` with shape
/// `(batch_size, action_dim)`; `logp` has shape `(batch_size,)`.
pub fn squash_correction(logp: &Tensor, actions: &Tensor) -> Result<Tensor> {
    let diff = ((1.0 - actions.sqr()?)? + EPS)?.log()?.sum(D::Minus1)?;
    Ok((logp - diff)?)
}

/// Clamps raw actions to `[-atanh(1 - EPS), atanh(1 - EPS)]`.
///
/// `tanh` of the result stays inside the range [`atanh`] inverts without
/// clamping, so squashed actions map back to the same raw values.
pub fn clamp_raw(t: &Tensor) -> Result<Tensor> {
    let bound = (1.0 - EPS).atanh();
    Ok(t.clamp(-bound, bound)?)
}

/// Inverse hyperbolic tangent.
///
/// The input is clamped to `[-1 + EPS, 1 - EPS]` so that actions on the
/// boundary map to finite values.
pub fn atanh(t: &Tensor) -> Result<Tensor> {
    let t = t.clamp(-1.0 + EPS, 1.0 - EPS)?;
    let num = (1.0 + &t)?;
    let den = (1.0 - &t)?;
    Ok(((num / den)?.log()? * 0.5)?)
}
