//! Gaussian policy with optional `tanh` squashing.
use super::GaussianPolicyConfig;
use crate::{
    dist::{DiagonalGaussian, GaussianParams},
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    squash::{atanh, clamp_raw, squash_correction, EPS},
    util::{param_stats, track, OutDim},
};
use anyhow::{ensure, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{info, trace};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use waveft_core::record::Record;

/// Output of [`GaussianPolicy::act`].
#[derive(Debug, Clone)]
pub struct PolicyOutput {
    /// Actions scaled by `max_action`, shape `(batch_size, action_dim)`.
    pub actions: Tensor,

    /// Log probabilities of the actions, shape `(batch_size,)`.
    pub logp: Tensor,

    /// Parameters of the Gaussian the actions were drawn from.
    pub params: GaussianParams,
}

/// Stochastic policy over continuous actions.
///
/// The network `P` maps observations to the parameters of a diagonal
/// Gaussian. Raw actions are either the mean (evaluation) or a sample; if
/// squashing is enabled they are passed through `tanh`, and the log
/// probability is corrected for the change of variables. Returned actions are
/// finally multiplied by `max_action`.
pub struct GaussianPolicy<P>
where
    P: SubModel1<Output = GaussianParams>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the action vector.
    out_dim: i64,

    net_config: P::Config,
    net: P,
    dist: DiagonalGaussian,

    max_action: f64,
    squash: bool,

    // Optimizer
    opt_config: OptimizerConfig,
    opt: Optimizer,
}

fn build_net<P>(varmap: &VarMap, config: P::Config, device: &Device) -> Result<P>
where
    P: SubModel1<Output = GaussianParams>,
{
    let vb = VarBuilder::from_varmap(varmap, DType::F32, device).set_prefix("policy");
    P::build(vb, config)
}

impl<P> GaussianPolicy<P>
where
    P: SubModel1<Output = GaussianParams>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`GaussianPolicy`].
    pub fn build(config: GaussianPolicyConfig<P::Config>, device: Device) -> Result<Self> {
        ensure!(
            config.max_action.is_finite() && config.max_action > 0.0,
            "max_action must be positive, got {}",
            config.max_action
        );
        let net_config = config.net_config.context("net_config is not set.")?;
        let out_dim = net_config.get_out_dim();
        ensure!(out_dim > 0, "action dimension must be positive");

        let varmap = VarMap::new();
        let net = build_net::<P>(&varmap, net_config.clone(), &device)?;
        let opt_config = config.opt_config;
        let opt = opt_config.build(varmap.all_vars())?;
        info!(
            "Build policy: action_dim = {}, max_action = {}, squash = {}",
            out_dim, config.max_action, config.squash
        );

        Ok(Self {
            device,
            varmap,
            out_dim,
            net_config,
            net,
            dist: DiagonalGaussian::new(out_dim as _),
            max_action: config.max_action,
            squash: config.squash,
            opt_config,
            opt,
        })
    }

    /// Returns the parameters of the Gaussian given observations.
    ///
    /// Both tensors have shape `(batch_size, action_dim)`.
    pub fn dist_params(&self, obs: &P::Input) -> Result<GaussianParams> {
        let params = self.net.forward(obs)?;
        debug_assert_eq!(params.mean.dims().len(), 2);
        debug_assert_eq!(params.mean.dims()[1], self.out_dim as usize);
        debug_assert_eq!(params.log_std.dims(), params.mean.dims());
        Ok(params)
    }

    /// Returns actions and their log probabilities.
    ///
    /// If `test` is `true`, the mean of the Gaussian is used as the raw
    /// action. Otherwise, raw actions are sampled. When squashing, raw actions
    /// are clamped to the range in which `tanh` can be inverted, so the
    /// returned `logp` equals [`GaussianPolicy::compute_log_probs`] of the
    /// returned actions.
    pub fn act(&self, obs: &P::Input, test: bool) -> Result<PolicyOutput> {
        let params = self.dist_params(obs)?;
        let raw = match test {
            true => params.mean.clone(),
            false => self.dist.sample(&params)?,
        };

        let (actions, logp) = match self.squash {
            true => {
                let actions = clamp_raw(&raw)?.tanh()?;
                let logp = self.squashed_log_probs(&actions, &params)?;
                (actions, logp)
            }
            false => {
                let logp = self.dist.log_likelihood(&raw, &params)?;
                (raw, logp)
            }
        };

        Ok(PolicyOutput {
            actions: (actions * self.max_action)?,
            logp,
            params,
        })
    }

    /// Returns the log probabilities of `actions`, shape `(batch_size,)`.
    ///
    /// `actions` are in the scale of the outputs of [`GaussianPolicy::act`].
    pub fn compute_log_probs(&self, obs: &P::Input, actions: &Tensor) -> Result<Tensor> {
        let params = self.dist_params(obs)?;
        let actions = (actions.to_device(&self.device)? / self.max_action)?;

        match self.squash {
            true => self.squashed_log_probs(&actions, &params),
            false => self.dist.log_likelihood(&actions, &params),
        }
    }

    // Log probabilities of squashed actions in `[-1, 1]`.
    fn squashed_log_probs(&self, actions: &Tensor, params: &GaussianParams) -> Result<Tensor> {
        trace!("Inverse transformation of squashed actions");
        let actions = actions.clamp(-1.0 + EPS, 1.0 - EPS)?;
        let raw = atanh(&actions)?;
        let logp = self.dist.log_likelihood(&raw, params)?;
        squash_correction(&logp, &actions)
    }

    /// Returns the entropy of the Gaussian before squashing, shape `(batch_size,)`.
    pub fn compute_entropy(&self, obs: &P::Input) -> Result<Tensor> {
        let params = self.dist_params(obs)?;
        self.dist.entropy(&params)
    }

    /// Updates the parameters to decrease `loss`.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)?;
        Ok(())
    }

    /// Returns the mean and standard deviation of every parameter.
    pub fn param_stats(&self) -> Result<Record> {
        param_stats(&self.varmap)
    }

    /// Parameter store of the policy.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Network producing the distribution parameters.
    pub fn net(&self) -> &P {
        &self.net
    }

    /// The action distribution.
    pub fn dist(&self) -> &DiagonalGaussian {
        &self.dist
    }

    /// Action scale.
    pub fn max_action(&self) -> f64 {
        self.max_action
    }

    /// Whether actions are squashed.
    pub fn squash(&self) -> bool {
        self.squash
    }

    /// Device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns a policy with a copy of the parameters and a fresh optimizer.
    pub fn try_clone(&self) -> Result<Self> {
        let varmap = VarMap::new();
        let net = build_net::<P>(&varmap, self.net_config.clone(), &self.device)?;
        track(&varmap, &self.varmap, 1.0)?;
        let opt = self.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device: self.device.clone(),
            varmap,
            out_dim: self.out_dim,
            net_config: self.net_config.clone(),
            net,
            dist: self.dist,
            max_action: self.max_action,
            squash: self.squash,
            opt_config: self.opt_config.clone(),
            opt,
        })
    }

    /// Save variables to prefix + ".safetensors".
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("safetensors");
        self.varmap.save(path.as_path())?;
        info!("Save policy parameters to {:?}", path);

        Ok(path)
    }

    /// Load variables from prefix + ".safetensors".
    pub fn load(&mut self, prefix: impl AsRef<Path>) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("safetensors");
        self.varmap.load(path.as_path())?;
        info!("Load policy parameters from {:?}", path);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::policy::{LogStdMode, WaveFtActor, WaveFtActorConfig, WaveFtNetConfig};
    use crate::tcn::TcnConfig;

    fn actor(squash: bool, max_action: f64) -> Result<WaveFtActor> {
        let net_config = WaveFtNetConfig::for_action_dim(2)
            .tcn(TcnConfig::default().nb_filters(4).dilations(vec![1, 2]))
            .units(vec![32, 32]);
        let config = WaveFtActorConfig::default()
            .net_config(net_config)
            .max_action(max_action)
            .squash(squash);
        WaveFtActor::build(config, Device::Cpu)
    }

    fn states(actor: &WaveFtActor, batch_size: usize) -> Result<Tensor> {
        let state_dim = actor.net().config().layout.state_dim(12);
        Ok(Tensor::randn(0f32, 1f32, (batch_size, state_dim), &Device::Cpu)?)
    }

    #[test]
    fn test_deterministic_act_returns_mean() -> Result<()> {
        let actor = actor(false, 2.0)?;
        let s = states(&actor, 4)?;
        let out = actor.act(&s, true)?;
        let expected = (out.params.mean.clone() * 2.0)?;
        let diff = (out.actions - expected)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert!(diff < 1e-6);

        // Deterministic evaluation is repeatable
        let out2 = actor.act(&s, true)?;
        let diff = (out.logp - out2.logp)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert!(diff < 1e-6);
        Ok(())
    }

    #[test]
    fn test_squashed_actions_are_bounded() -> Result<()> {
        let actor = actor(true, 3.0)?;
        let s = (states(&actor, 16)? * 10.0)?;
        let a = actor.act(&s, false)?.actions.flatten_all()?.to_vec1::<f32>()?;
        assert!(a.iter().all(|v| v.abs() <= 3.0));
        Ok(())
    }

    #[test]
    fn test_log_probs_match_act() -> Result<()> {
        for squash in [false, true].iter() {
            let actor = actor(*squash, 1.5)?;
            let s = states(&actor, 8)?;
            let out = actor.act(&s, false)?;
            let logp = actor.compute_log_probs(&s, &out.actions)?;

            let v1 = out.logp.to_vec1::<f32>()?;
            let v2 = logp.to_vec1::<f32>()?;
            for (a, b) in v1.iter().zip(v2.iter()) {
                assert!((a - b).abs() < 1e-2, "squash = {}: {} vs {}", squash, a, b);
            }
        }
        Ok(())
    }

    #[test]
    fn test_log_probs_match_act_with_wide_std() -> Result<()> {
        // Samples far beyond the range where tanh is invertible in f32
        let net_config = WaveFtNetConfig::for_action_dim(2)
            .tcn(TcnConfig::default().nb_filters(4).dilations(vec![1, 2]))
            .units(vec![32])
            .log_std(LogStdMode::Fixed { std: 7.0 });
        let config = WaveFtActorConfig::default()
            .net_config(net_config)
            .squash(true);
        let actor = WaveFtActor::build(config, Device::Cpu)?;
        let s = states(&actor, 256)?;

        let out = actor.act(&s, false)?;
        let logp = actor.compute_log_probs(&s, &out.actions)?;
        let diff = (&out.logp - logp)?.abs()?.max(0)?.to_scalar::<f32>()?;
        assert!(diff < 1e-4, "max |diff| = {}", diff);

        let logp = out.logp.to_vec1::<f32>()?;
        assert!(logp.iter().all(|v| v.is_finite()));
        Ok(())
    }

    #[test]
    fn test_entropy_of_state_independent_std() -> Result<()> {
        let actor = actor(false, 1.0)?;
        let s = states(&actor, 3)?;
        let ent = actor.compute_entropy(&s)?.to_vec1::<f32>()?;
        let per_dim = -0.5 + 0.5 * (2.0 * std::f32::consts::PI * std::f32::consts::E).ln();
        assert!(ent.iter().all(|e| (e - 2.0 * per_dim).abs() < 1e-5));
        Ok(())
    }

    #[test]
    fn test_invalid_max_action() {
        assert!(actor(false, 0.0).is_err());
        assert!(actor(false, f64::NAN).is_err());
    }

    #[test]
    fn test_missing_net_config() {
        let config = WaveFtActorConfig::default();
        assert!(WaveFtActor::build(config, Device::Cpu).is_err());
    }

    #[test]
    fn test_backward_step_moves_log_std() -> Result<()> {
        let mut actor = actor(false, 1.0)?;
        let s = states(&actor, 4)?;

        // Maximizing the entropy increases the state-independent log std
        let loss = (actor.compute_entropy(&s)?.mean_all()? * -1.0)?;
        actor.backward_step(&loss)?;

        let record = actor.param_stats()?;
        assert!(record.get_scalar("policy.log_std_mean")? > -0.5);
        Ok(())
    }

    #[test]
    fn test_fixed_std_has_no_log_std_variable() -> Result<()> {
        let net_config = WaveFtNetConfig::for_action_dim(2).log_std(LogStdMode::fixed());
        let config = WaveFtActorConfig::default().net_config(net_config);
        let actor = WaveFtActor::build(config, Device::Cpu)?;
        assert!(actor.param_stats()?.get("policy.log_std_mean").is_none());
        Ok(())
    }
}
