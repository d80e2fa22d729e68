//! Dual-branch network producing Gaussian parameters.
use super::{LogStdMode, WaveFtNetConfig};
use crate::{
    dist::GaussianParams,
    mlp::{create_linear_layers, mlp_forward, Mlp},
    model::SubModel1,
    tcn::Tcn,
    util::OutDim,
};
use anyhow::{ensure, Result};
use candle_core::{Device, Module, Tensor, D};
use candle_nn::{init::Init, linear, Linear, VarBuilder};
use log::trace;

enum LogStd {
    /// Constant log std.
    Fixed(f64),

    /// Trainable vector of shape `(action_dim,)`.
    Param(Tensor),

    /// Linear head with clipping.
    Head { head: Linear, min: f64, max: f64 },
}

/// Network splitting the state into its kinematic slice and force/torque
/// series, encoding each with its own branch and fusing the features into the
/// mean and log standard deviation of a Gaussian policy.
///
/// Input: `(batch_size, state_dim)`. The number of F/T steps is derived from
/// `state_dim` on every call, so the same network accepts different window
/// lengths.
pub struct WaveFtNet {
    config: WaveFtNetConfig,
    device: Device,
    kinematic: Mlp,
    ft: Tcn,
    trunk: Vec<Linear>,
    mean_head: Linear,
    log_std: LogStd,
}

fn check_config(config: &WaveFtNetConfig) -> Result<()> {
    ensure!(config.action_dim > 0, "action_dim must be positive");
    ensure!(!config.units.is_empty(), "units of the fusion layers must not be empty");
    ensure!(
        config.kinematic.get_in_dim() == config.layout.kinematic_dim as i64,
        "input of the kinematic encoder ({}) differs from the kinematic slice ({})",
        config.kinematic.get_in_dim(),
        config.layout.kinematic_dim
    );
    ensure!(
        config.tcn.in_channels == config.layout.ft_channels as i64,
        "input channels of the TCN ({}) differ from the F/T channels ({})",
        config.tcn.in_channels,
        config.layout.ft_channels
    );
    if let LogStdMode::Fixed { std } = config.log_std {
        ensure!(std > 0.0, "fixed std must be positive");
    }
    if let LogStdMode::StateDependent { min, max } = config.log_std {
        ensure!(min < max, "log std bounds must satisfy min < max");
    }
    Ok(())
}

impl WaveFtNet {
    /// Returns the configuration.
    pub fn config(&self) -> &WaveFtNetConfig {
        &self.config
    }

    fn log_std(&self, mean: &Tensor, features: &Tensor) -> Result<Tensor> {
        let log_std = match &self.log_std {
            LogStd::Fixed(v) => (mean.ones_like()? * *v)?,
            LogStd::Param(t) => t.unsqueeze(0)?.broadcast_as(mean.shape())?.contiguous()?,
            LogStd::Head { head, min, max } => head.forward(features)?.clamp(*min, *max)?,
        };
        Ok(log_std)
    }
}

impl SubModel1 for WaveFtNet {
    type Config = WaveFtNetConfig;
    type Input = Tensor;
    type Output = GaussianParams;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        check_config(&config)?;
        let device = vb.device().clone();
        let action_dim = config.get_out_dim() as usize;

        let kinematic = Mlp::build(vb.pp("x"), config.kinematic.clone())?;
        let ft = Tcn::build(vb.pp("ft"), config.tcn.clone())?;
        let fused_dim = config.kinematic.get_out_dim() + config.tcn.get_out_dim();
        let trunk = create_linear_layers("fusion", vb.clone(), fused_dim, &config.units)?;

        let last_dim = *config.units.last().unwrap_or(&fused_dim) as usize;
        let mean_head = linear(last_dim, action_dim, vb.pp("mean"))?;
        let log_std = match config.log_std {
            LogStdMode::Fixed { std } => LogStd::Fixed(std.ln()),
            LogStdMode::StateIndependent { init } => {
                LogStd::Param(vb.get_with_hints(action_dim, "log_std", Init::Const(init))?)
            }
            LogStdMode::StateDependent { min, max } => LogStd::Head {
                head: linear(last_dim, action_dim, vb.pp("log_std"))?,
                min,
                max,
            },
        };

        Ok(Self {
            config,
            device,
            kinematic,
            ft,
            trunk,
            mean_head,
            log_std,
        })
    }

    fn forward(&self, states: &Self::Input) -> Result<GaussianParams> {
        let (batch_size, state_dim) = states.dims2()?;
        let layout = &self.config.layout;
        let ft_len = layout.ft_len(state_dim)?;
        trace!("WaveFtNet::forward(), batch_size = {}, ft_len = {}", batch_size, ft_len);

        let states = states.to_device(&self.device)?;
        let x = states.narrow(1, 0, layout.kinematic_dim)?.contiguous()?;
        let ft = states
            .narrow(1, layout.kinematic_dim, state_dim - layout.kinematic_dim)?
            .contiguous()?
            .reshape((batch_size, ft_len, layout.ft_channels))?;

        let x_features = self.kinematic.forward(&x)?;
        let ft_features = self.ft.forward(&ft)?;
        let features = Tensor::cat(&[x_features, ft_features], D::Minus1)?;
        let act = self.config.activation;
        let features = mlp_forward(features, &self.trunk, &act, &act)?;

        let mean = self.mean_head.forward(&features)?;
        let log_std = self.log_std(&mean, &features)?;

        Ok(GaussianParams { mean, log_std })
    }
}
