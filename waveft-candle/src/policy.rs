//! Gaussian policy on mixed kinematic/force-torque states.
mod base;
mod config;
mod net;
pub use base::{GaussianPolicy, PolicyOutput};
pub use config::{GaussianPolicyConfig, LogStdMode, WaveFtNetConfig};
pub use net::WaveFtNet;

/// Policy with the dual-branch network.
pub type WaveFtActor = GaussianPolicy<WaveFtNet>;

/// Configuration of [`WaveFtActor`].
pub type WaveFtActorConfig = GaussianPolicyConfig<WaveFtNetConfig>;
