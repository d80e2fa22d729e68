//! Temporal convolutional network.
//!
//! Residual stacks of dilated causal 1-D convolutions. The receptive field of
//! a stack grows geometrically with the dilations, so a few blocks cover the
//! whole sensor window.
mod base;
mod block;
mod config;
pub use base::Tcn;
pub use block::{CausalConv1d, ResidualBlock};
pub use config::TcnConfig;
