//! Diagonal Gaussian distribution over continuous actions.
use anyhow::{ensure, Result};
use candle_core::{Tensor, D};

/// `0.5 * ln(2π)`.
const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;

/// Parameters of a diagonal Gaussian.
///
/// Both tensors have shape `(batch_size, action_dim)`.
#[derive(Debug, Clone)]
pub struct GaussianParams {
    /// Mean.
    pub mean: Tensor,

    /// Log of the standard deviation.
    pub log_std: Tensor,
}

impl GaussianParams {
    /// Returns the standard deviation.
    pub fn std(&self) -> Result<Tensor> {
        Ok(self.log_std.exp()?)
    }
}

/// Diagonal Gaussian distribution of dimension `dim`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagonalGaussian {
    dim: usize,
}

impl DiagonalGaussian {
    /// Creates a distribution of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Dimension of the distribution.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check_dim(&self, t: &Tensor, name: &str) -> Result<()> {
        let d = t.dims().last().copied().unwrap_or(0);
        ensure!(
            d == self.dim,
            "last dimension of {} is {}, expected {}",
            name,
            d,
            self.dim
        );
        Ok(())
    }

    fn check_params(&self, params: &GaussianParams) -> Result<()> {
        self.check_dim(&params.mean, "mean")?;
        self.check_dim(&params.log_std, "log_std")?;
        ensure!(
            params.mean.dims() == params.log_std.dims(),
            "mean and log_std have different shapes: {:?}, {:?}",
            params.mean.dims(),
            params.log_std.dims()
        );
        Ok(())
    }

    /// Draws a sample `mean + std * z` with `z ~ N(0, I)`.
    pub fn sample(&self, params: &GaussianParams) -> Result<Tensor> {
        let noise = params.mean.randn_like(0.0, 1.0)?;
        self.sample_with_noise(params, &noise)
    }

    /// Same as [`DiagonalGaussian::sample`] with given standard normal noise.
    pub fn sample_with_noise(&self, params: &GaussianParams, noise: &Tensor) -> Result<Tensor> {
        self.check_params(params)?;
        ensure!(
            noise.dims() == params.mean.dims(),
            "noise has shape {:?}, expected {:?}",
            noise.dims(),
            params.mean.dims()
        );
        Ok(((params.std()? * noise)? + &params.mean)?)
    }

    /// Log density of `x`, summed over the action dimension.
    ///
    /// Returns a tensor of shape `(batch_size,)`.
    pub fn log_likelihood(&self, x: &Tensor, params: &GaussianParams) -> Result<Tensor> {
        self.check_params(params)?;
        self.check_dim(x, "x")?;
        let x = x.to_device(params.mean.device())?;
        let z = ((x - &params.mean)? / params.std()?)?;
        let quad = (z.sqr()?.sum(D::Minus1)? * -0.5)?;
        let log_norm = params.log_std.sum(D::Minus1)?;

        Ok(((quad - log_norm)? - HALF_LN_2PI * self.dim as f64)?)
    }

    /// Differential entropy, shape `(batch_size,)`.
    pub fn entropy(&self, params: &GaussianParams) -> Result<Tensor> {
        self.check_params(params)?;
        // 0.5 * ln(2πe) per dimension
        let c = HALF_LN_2PI + 0.5;
        Ok((params.log_std.sum(D::Minus1)? + c * self.dim as f64)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::Device;

    fn params(mean: &[f32], log_std: &[f32], dim: usize) -> Result<GaussianParams> {
        let n = mean.len() / dim;
        Ok(GaussianParams {
            mean: Tensor::from_slice(mean, (n, dim), &Device::Cpu)?,
            log_std: Tensor::from_slice(log_std, (n, dim), &Device::Cpu)?,
        })
    }

    #[test]
    fn test_log_likelihood_standard_normal() -> Result<()> {
        let dist = DiagonalGaussian::new(2);
        let p = params(&[0.0, 0.0], &[0.0, 0.0], 2)?;
        let x = Tensor::from_slice(&[1.0f32, -1.0], (1, 2), &Device::Cpu)?;
        let logp = dist.log_likelihood(&x, &p)?.to_vec1::<f32>()?;

        // -0.5 * (1 + 1) - ln(2π)
        let expected = -1.0 - (2.0 * std::f32::consts::PI).ln();
        assert!((logp[0] - expected).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_log_likelihood_scaled() -> Result<()> {
        let dist = DiagonalGaussian::new(1);
        let log_std = 2f32.ln();
        let p = params(&[1.0, 1.0], &[log_std, log_std], 1)?;
        let x = Tensor::from_slice(&[1.0f32, 3.0], (2, 1), &Device::Cpu)?;
        let logp = dist.log_likelihood(&x, &p)?.to_vec1::<f32>()?;

        let c = -log_std - 0.5 * (2.0 * std::f32::consts::PI).ln();
        assert!((logp[0] - c).abs() < 1e-5);
        assert!((logp[1] - (c - 0.5)).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_entropy() -> Result<()> {
        let dist = DiagonalGaussian::new(3);
        let p = params(&[0.0; 3], &[0.0, -0.5, 1.0], 3)?;
        let ent = dist.entropy(&p)?.to_vec1::<f32>()?;
        let per_dim = 0.5 * (2.0 * std::f32::consts::PI * std::f32::consts::E).ln();
        assert!((ent[0] - (0.5 + 3.0 * per_dim)).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_sample_with_noise() -> Result<()> {
        let dist = DiagonalGaussian::new(2);
        let p = params(&[1.0, -1.0], &[0.0, 2f32.ln()], 2)?;
        let noise = Tensor::from_slice(&[0.5f32, 0.5], (1, 2), &Device::Cpu)?;
        let x = dist.sample_with_noise(&p, &noise)?.to_vec2::<f32>()?;
        assert!((x[0][0] - 1.5).abs() < 1e-5);
        assert!((x[0][1] - 0.0).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() -> Result<()> {
        let dist = DiagonalGaussian::new(3);
        let p = params(&[0.0, 0.0], &[0.0, 0.0], 2)?;
        assert!(dist.sample(&p).is_err());
        assert!(dist.entropy(&p).is_err());

        // Parameters are fine but the sample is not
        let p = params(&[0.0; 3], &[0.0; 3], 3)?;
        let x = Tensor::from_slice(&[1.0f32, -1.0], (1, 2), &Device::Cpu)?;
        assert!(dist.log_likelihood(&x, &p).is_err());
        assert!(dist.log_likelihood(&x.pad_with_zeros(1, 0, 1)?, &p).is_ok());
        Ok(())
    }
}
