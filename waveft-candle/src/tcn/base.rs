use super::{ResidualBlock, TcnConfig};
use crate::model::SubModel1;
use anyhow::{ensure, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use log::trace;

/// Temporal convolutional network returning features of the last time step.
///
/// Input: `(batch, len, in_channels)`, output: `(batch, out_dim)`.
pub struct Tcn {
    config: TcnConfig,
    device: Device,
    blocks: Vec<ResidualBlock>,
    head: Linear,
}

impl Tcn {
    /// Returns the configuration.
    pub fn config(&self) -> &TcnConfig {
        &self.config
    }
}

impl SubModel1 for Tcn {
    type Config = TcnConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        ensure!(!config.dilations.is_empty(), "dilations must not be empty");
        ensure!(config.nb_stacks > 0, "nb_stacks must be positive");
        ensure!(config.nb_filters > 0, "nb_filters must be positive");

        let device = vb.device().clone();
        let vb_blocks = vb.pp("tcn");
        let mut blocks = vec![];
        let mut in_channels = config.in_channels as usize;

        for s in 0..config.nb_stacks {
            for &d in config.dilations.iter() {
                let name = format!("s{}_d{}", s, d);
                blocks.push(ResidualBlock::new(
                    in_channels,
                    config.nb_filters as _,
                    config.kernel_size,
                    d,
                    vb_blocks.pp(name),
                )?);
                in_channels = config.nb_filters as _;
            }
        }
        let head = linear(config.nb_filters as _, config.out_dim as _, vb.pp("head"))?;

        Ok(Self {
            config,
            device,
            blocks,
            head,
        })
    }

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let (_, len, channels) = xs.dims3()?;
        ensure!(len > 0, "time series must have at least one step");
        ensure!(
            channels == self.config.in_channels as usize,
            "expected {} channels, got {}",
            self.config.in_channels,
            channels
        );
        trace!("Tcn::forward(), len = {}", len);

        // (batch, len, channels) -> (batch, channels, len)
        let mut xs = xs.to_device(&self.device)?.transpose(1, 2)?.contiguous()?;
        let mut skip_sum: Option<Tensor> = None;

        for block in self.blocks.iter() {
            let (out, skip) = block.forward(&xs)?;
            if self.config.use_skip_connections {
                skip_sum = Some(match skip_sum {
                    None => skip,
                    Some(acc) => (acc + skip)?,
                });
            }
            xs = out;
        }

        let xs = match skip_sum {
            Some(acc) => acc,
            None => xs,
        };
        let last = xs.narrow(2, len - 1, 1)?.squeeze(2)?;

        Ok(self.head.forward(&last)?)
    }
}
