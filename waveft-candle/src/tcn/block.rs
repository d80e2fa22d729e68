use anyhow::{ensure, Result};
use candle_core::{Module, Tensor};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, VarBuilder};

/// Dilated 1-D convolution that does not look into the future.
///
/// The input of shape `(batch, channels, len)` is left-padded with
/// `(kernel_size - 1) * dilation` zeros, so the output has the same length
/// and step `t` depends only on input steps `<= t`.
pub struct CausalConv1d {
    conv: Conv1d,
    pad: usize,
}

impl CausalConv1d {
    /// Creates a causal convolution.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dilation: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        ensure!(kernel_size > 0, "kernel_size must be positive");
        ensure!(dilation > 0, "dilation must be positive");
        let config = Conv1dConfig {
            dilation,
            ..Default::default()
        };
        let conv = conv1d(in_channels, out_channels, kernel_size, config, vb)?;

        Ok(Self {
            conv,
            pad: (kernel_size - 1) * dilation,
        })
    }

    /// Applies the convolution.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = match self.pad {
            0 => xs.clone(),
            pad => xs.pad_with_zeros(2, pad, 0)?,
        };
        Ok(self.conv.forward(&xs)?)
    }
}

/// Residual block of two causal convolutions with the same dilation.
///
/// When the numbers of input and output channels differ, the residual path
/// goes through a 1x1 convolution.
pub struct ResidualBlock {
    conv1: CausalConv1d,
    conv2: CausalConv1d,
    downsample: Option<Conv1d>,
}

impl ResidualBlock {
    /// Creates a residual block.
    pub fn new(
        in_channels: usize,
        nb_filters: usize,
        kernel_size: usize,
        dilation: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let conv1 = CausalConv1d::new(in_channels, nb_filters, kernel_size, dilation, vb.pp("conv1"))?;
        let conv2 = CausalConv1d::new(nb_filters, nb_filters, kernel_size, dilation, vb.pp("conv2"))?;
        let downsample = match in_channels == nb_filters {
            true => None,
            false => Some(conv1d(
                in_channels,
                nb_filters,
                1,
                Default::default(),
                vb.pp("downsample"),
            )?),
        };

        Ok(Self {
            conv1,
            conv2,
            downsample,
        })
    }

    /// Returns the block output and the skip output.
    pub fn forward(&self, xs: &Tensor) -> Result<(Tensor, Tensor)> {
        let h = self.conv1.forward(xs)?.relu()?;
        let h = self.conv2.forward(&h)?.relu()?;
        let res = match &self.downsample {
            None => xs.clone(),
            Some(conv) => conv.forward(xs)?,
        };
        let out = (res + &h)?.relu()?;

        Ok((out, h))
    }
}
