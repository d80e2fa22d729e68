//! Proximal policy optimization losses for [`GaussianPolicy`].
//!
//! Only the loss computations live here; collecting rollouts and estimating
//! advantages is left to the caller.
use crate::{
    dist::GaussianParams,
    model::SubModel1,
    policy::GaussianPolicy,
    util::{to_vec_f32, OutDim},
};
use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};
use chrono::Local;
use log::trace;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use waveft_core::record::{Record, RecordValue};

/// Configuration of the PPO losses.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig {
    /// If `true`, the probability ratio is clipped.
    pub clip: bool,

    /// Clipping range of the probability ratio.
    pub clip_ratio: f64,

    /// Weight of the entropy bonus.
    pub entropy_coef: f64,

    /// Weight of the critic loss in a combined loss.
    pub vfunc_coef: f64,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            clip: true,
            clip_ratio: 0.2,
            entropy_coef: 0.01,
            vfunc_coef: 1.0,
        }
    }
}

impl PpoConfig {
    /// Enables or disables clipping.
    pub fn clip(mut self, v: bool) -> Self {
        self.clip = v;
        self
    }

    /// Sets the clipping range.
    pub fn clip_ratio(mut self, v: f64) -> Self {
        self.clip_ratio = v;
        self
    }

    /// Sets the weight of the entropy bonus.
    pub fn entropy_coef(mut self, v: f64) -> Self {
        self.entropy_coef = v;
        self
    }

    /// Sets the weight of the critic loss.
    pub fn vfunc_coef(mut self, v: f64) -> Self {
        self.vfunc_coef = v;
        self
    }

    /// Returns the actor loss and statistics of the update.
    ///
    /// `advantages` and `logp_olds` have shape `(batch_size,)` or
    /// `(batch_size, 1)`. The record holds the scalars `actor_loss`,
    /// `logp_max`, `logp_min`, `logp_mean`, `adv_max`, `adv_min`, `kl`, `ent`
    /// and `ratio`, and the per-sample arrays `logp` and `adv`.
    pub fn actor_loss<P>(
        &self,
        policy: &GaussianPolicy<P>,
        obs: &P::Input,
        actions: &Tensor,
        advantages: &Tensor,
        logp_olds: &Tensor,
    ) -> Result<(Tensor, Record)>
    where
        P: SubModel1<Output = GaussianParams>,
        P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    {
        let device = policy.device();
        let advantages = advantages.to_device(device)?.flatten_all()?.detach();
        let logp_olds = logp_olds.to_device(device)?.flatten_all()?.detach();
        let actions = actions.detach();

        let ent = policy.compute_entropy(obs)?.mean_all()?;
        let logp_news = policy.compute_log_probs(obs, &actions)?;
        ensure!(
            logp_news.dims() == advantages.dims() && logp_news.dims() == logp_olds.dims(),
            "batch sizes differ: logp {:?}, advantages {:?}, old logp {:?}",
            logp_news.dims(),
            advantages.dims(),
            logp_olds.dims()
        );

        let ratio = (&logp_news - &logp_olds)?.exp()?;
        let surrogate = (&ratio * &advantages)?;
        let objective = match self.clip {
            true => {
                let clipped = ratio.clamp(1.0 - self.clip_ratio, 1.0 + self.clip_ratio)?;
                surrogate.minimum(&(clipped * &advantages)?)?
            }
            false => surrogate,
        };
        let loss = ((objective.mean_all()? * -1.0)? - (&ent * self.entropy_coef)?)?;
        trace!("actor_loss(), clip = {}", self.clip);

        let record = {
            let scalar = |t: Tensor| -> Result<RecordValue> {
                Ok(RecordValue::Scalar(t.to_dtype(DType::F32)?.to_scalar::<f32>()?))
            };

            Record::from_slice(&[
                ("actor_loss", scalar(loss.clone())?),
                ("logp_max", scalar(logp_news.max(0)?)?),
                ("logp_min", scalar(logp_news.min(0)?)?),
                ("logp_mean", scalar(logp_news.mean_all()?)?),
                ("adv_max", scalar(advantages.max(0)?)?),
                ("adv_min", scalar(advantages.min(0)?)?),
                ("kl", scalar((&logp_olds - &logp_news)?.mean_all()?)?),
                ("ent", scalar(ent)?),
                ("ratio", scalar(ratio.mean_all()?)?),
                ("logp", RecordValue::Array1(to_vec_f32(&logp_news)?)),
                ("adv", RecordValue::Array1(to_vec_f32(&advantages)?)),
            ])
        };

        Ok((loss, record))
    }

    /// Returns `mean(0.5 * (returns - values)^2)`.
    pub fn critic_loss(&self, values: &Tensor, returns: &Tensor) -> Result<Tensor> {
        let values = values.flatten_all()?;
        let returns = returns.to_device(values.device())?.flatten_all()?;
        ensure!(
            values.dims() == returns.dims(),
            "values {:?} and returns {:?} differ in shape",
            values.dims(),
            returns.dims()
        );
        Ok(((returns - values)?.sqr()?.mean_all()? * 0.5)?)
    }

    /// Returns `actor_loss + vfunc_coef * critic_loss`.
    pub fn total_loss(&self, actor_loss: &Tensor, critic_loss: &Tensor) -> Result<Tensor> {
        Ok((actor_loss + (critic_loss * self.vfunc_coef)?)?)
    }

    /// Computes the actor loss and applies one optimization step on the policy.
    ///
    /// The returned record is [`PpoConfig::actor_loss`]'s plus a `timestamp`.
    pub fn train_actor<P>(
        &self,
        policy: &mut GaussianPolicy<P>,
        obs: &P::Input,
        actions: &Tensor,
        advantages: &Tensor,
        logp_olds: &Tensor,
    ) -> Result<Record>
    where
        P: SubModel1<Output = GaussianParams>,
        P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    {
        let (loss, mut record) = self.actor_loss(policy, obs, actions, advantages, logp_olds)?;
        policy.backward_step(&loss)?;
        record.insert("timestamp", RecordValue::DateTime(Local::now()));
        Ok(record)
    }
}
