//! Configurations of the policy network and the policy.
use crate::{
    mlp::MlpConfig, opt::OptimizerConfig, tcn::TcnConfig, util::OutDim, Activation,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use waveft_core::StateLayout;

/// Lower bound of the state-dependent log standard deviation.
pub const LOG_STD_MIN: f64 = -20.0;

/// Upper bound of the state-dependent log standard deviation.
pub const LOG_STD_MAX: f64 = 2.0;

/// How the log standard deviation of the policy is produced.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum LogStdMode {
    /// Constant standard deviation, not trained.
    Fixed {
        /// Standard deviation, must be positive.
        std: f64,
    },

    /// A trainable vector shared by all states.
    StateIndependent {
        /// Initial value of every entry.
        init: f64,
    },

    /// A linear head on the fused features, clipped to `[min, max]`.
    StateDependent {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

impl Default for LogStdMode {
    fn default() -> Self {
        Self::StateIndependent { init: -0.5 }
    }
}

impl LogStdMode {
    /// Constant standard deviation of 0.1.
    pub fn fixed() -> Self {
        Self::Fixed { std: 0.1 }
    }

    /// State-dependent head clipped to `[-20, 2]`.
    pub fn state_dependent() -> Self {
        Self::StateDependent {
            min: LOG_STD_MIN,
            max: LOG_STD_MAX,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`WaveFtNet`](super::WaveFtNet).
pub struct WaveFtNetConfig {
    /// Dimension of the action.
    pub action_dim: i64,

    /// Split of the state vector.
    pub layout: StateLayout,

    /// Encoder of the kinematic slice.
    pub kinematic: MlpConfig,

    /// Encoder of the force/torque series.
    pub tcn: TcnConfig,

    /// Units of the fusion layers.
    pub units: Vec<i64>,

    /// Activation of the fusion layers.
    #[serde(default)]
    pub activation: Activation,

    /// Log standard deviation.
    #[serde(default)]
    pub log_std: LogStdMode,
}

impl WaveFtNetConfig {
    /// Default network for a robot with `action_dim` actuated axes.
    ///
    /// The kinematic slice is encoded by `128 -> 128 -> 32` dense layers, the
    /// 6-channel F/T series by the default [`TcnConfig`], and the fused
    /// 64-dimensional features go through two layers of 256 units.
    pub fn for_action_dim(action_dim: usize) -> Self {
        let layout = StateLayout::for_action_dim(action_dim);
        let kinematic = MlpConfig::new(layout.kinematic_dim as _, vec![128, 128], 32, false);
        let tcn = TcnConfig::default().in_channels(layout.ft_channels as _);

        Self {
            action_dim: action_dim as _,
            layout,
            kinematic,
            tcn,
            units: vec![256, 256],
            activation: Activation::ReLU,
            log_std: LogStdMode::default(),
        }
    }

    /// Sets the state layout, adjusting the input sizes of both branches.
    pub fn layout(mut self, v: StateLayout) -> Self {
        self.kinematic.set_in_dim(v.kinematic_dim as _);
        self.tcn.in_channels = v.ft_channels as _;
        self.layout = v;
        self
    }

    /// Sets the configuration of the kinematic encoder.
    pub fn kinematic(mut self, v: MlpConfig) -> Self {
        self.kinematic = v;
        self
    }

    /// Sets the configuration of the force/torque encoder.
    pub fn tcn(mut self, v: TcnConfig) -> Self {
        self.tcn = v;
        self
    }

    /// Sets the units of the fusion layers.
    pub fn units(mut self, v: Vec<i64>) -> Self {
        self.units = v;
        self
    }

    /// Sets the activation of the fusion layers and the kinematic encoder.
    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = v;
        self.kinematic = self.kinematic.activation(v);
        self
    }

    /// Sets how the log standard deviation is produced.
    pub fn log_std(mut self, v: LogStdMode) -> Self {
        self.log_std = v;
        self
    }
}

impl OutDim for WaveFtNetConfig {
    fn get_out_dim(&self) -> i64 {
        self.action_dim
    }

    /// Sets the action dimension.
    ///
    /// The previous action is part of the kinematic slice of the robot
    /// layout, so a layout built by [`StateLayout::for_action_dim`] is rebuilt
    /// for the new dimension. Custom layouts are left as they are.
    fn set_out_dim(&mut self, v: i64) {
        if self.layout == StateLayout::for_action_dim(self.action_dim as _) {
            let layout = StateLayout::for_action_dim(v as _);
            self.kinematic.set_in_dim(layout.kinematic_dim as _);
            self.tcn.in_channels = layout.ft_channels as _;
            self.layout = layout;
        }
        self.action_dim = v;
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`GaussianPolicy`](super::GaussianPolicy).
pub struct GaussianPolicyConfig<P: OutDim> {
    /// Configuration of the network producing the distribution parameters.
    pub net_config: Option<P>,

    /// Optimizer.
    pub opt_config: OptimizerConfig,

    /// Actions are scaled by this value, must be positive.
    pub max_action: f64,

    /// If `true`, actions are squashed by `tanh` before scaling.
    pub squash: bool,
}

impl<P: OutDim> Default for GaussianPolicyConfig<P> {
    fn default() -> Self {
        Self {
            net_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
            max_action: 1.0,
            squash: false,
        }
    }
}

impl<P> GaussianPolicyConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for the network.
    pub fn net_config(mut self, v: P) -> Self {
        self.net_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the action scale.
    pub fn max_action(mut self, v: f64) -> Self {
        self.max_action = v;
        self
    }

    /// Enables or disables `tanh` squashing.
    pub fn squash(mut self, v: bool) -> Self {
        self.squash = v;
        self
    }

    /// Loads [`GaussianPolicyConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`GaussianPolicyConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_for_action_dim() {
        let config = WaveFtNetConfig::for_action_dim(6);
        assert_eq!(config.layout.kinematic_dim, 21);
        assert_eq!(config.kinematic.get_in_dim(), 21);
        assert_eq!(config.kinematic.get_out_dim(), 32);
        assert_eq!(config.tcn.in_channels, 6);
        assert_eq!(config.get_out_dim(), 6);
    }

    #[test]
    fn test_layout_updates_branches() {
        let config = WaveFtNetConfig::for_action_dim(2).layout(StateLayout::new(10, 3));
        assert_eq!(config.kinematic.get_in_dim(), 10);
        assert_eq!(config.tcn.in_channels, 3);
    }

    #[test]
    fn test_set_out_dim_rebuilds_robot_layout() {
        let mut config = WaveFtNetConfig::for_action_dim(6);
        config.set_out_dim(3);
        assert_eq!(config, WaveFtNetConfig::for_action_dim(3));

        let mut config = WaveFtNetConfig::for_action_dim(6).layout(StateLayout::new(10, 3));
        config.set_out_dim(3);
        assert_eq!(config.get_out_dim(), 3);
        assert_eq!(config.layout, StateLayout::new(10, 3));
        assert_eq!(config.kinematic.get_in_dim(), 10);
    }

    #[test]
    fn test_yaml_round_trip() -> Result<()> {
        let net_config = WaveFtNetConfig::for_action_dim(3)
            .log_std(LogStdMode::state_dependent())
            .activation(Activation::Tanh);
        let config = GaussianPolicyConfig::default()
            .net_config(net_config)
            .max_action(2.0)
            .squash(true);

        let dir = TempDir::new("waveft_config")?;
        let path = dir.path().join("policy.yaml");
        config.save(&path)?;
        let config_ = GaussianPolicyConfig::<WaveFtNetConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_log_std_defaults_in_yaml() -> Result<()> {
        let s = r#"
action_dim: 2
layout:
  kinematic_dim: 17
  ft_channels: 6
kinematic:
  in_dim: 17
  units: [64]
  out_dim: 16
  activation_out: false
tcn:
  in_channels: 6
  nb_filters: 4
  kernel_size: 2
  dilations: [1, 2]
  nb_stacks: 1
  use_skip_connections: false
  out_dim: 8
units: [32]
"#;
        let config: WaveFtNetConfig = serde_yaml::from_str(s)?;
        assert_eq!(config.log_std, LogStdMode::StateIndependent { init: -0.5 });
        assert_eq!(config.activation, Activation::ReLU);
        Ok(())
    }
}
