use crate::util::OutDim;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Tcn`](super::Tcn).
///
/// The default is the force/torque encoder: 6 input channels, 9 filters,
/// kernel size 3, dilations 1, 2, 4, 8 in a single stack and a 32-dimensional
/// output.
pub struct TcnConfig {
    /// Number of input channels.
    pub in_channels: i64,

    /// Number of filters of every convolution.
    pub nb_filters: i64,

    /// Kernel size of every convolution.
    pub kernel_size: usize,

    /// Dilations of the residual blocks in a stack.
    pub dilations: Vec<usize>,

    /// Number of stacks of residual blocks.
    pub nb_stacks: usize,

    /// If `true`, the skip outputs of all blocks are summed.
    pub use_skip_connections: bool,

    /// Output dimension of the linear head on the last time step.
    pub out_dim: i64,
}

impl Default for TcnConfig {
    fn default() -> Self {
        Self {
            in_channels: 6,
            nb_filters: 9,
            kernel_size: 3,
            dilations: vec![1, 2, 4, 8],
            nb_stacks: 1,
            use_skip_connections: false,
            out_dim: 32,
        }
    }
}

impl TcnConfig {
    /// Sets the number of input channels.
    pub fn in_channels(mut self, v: i64) -> Self {
        self.in_channels = v;
        self
    }

    /// Sets the number of filters.
    pub fn nb_filters(mut self, v: i64) -> Self {
        self.nb_filters = v;
        self
    }

    /// Sets the kernel size.
    pub fn kernel_size(mut self, v: usize) -> Self {
        self.kernel_size = v;
        self
    }

    /// Sets the dilations of a stack.
    pub fn dilations(mut self, v: Vec<usize>) -> Self {
        self.dilations = v;
        self
    }

    /// Sets the number of stacks.
    pub fn nb_stacks(mut self, v: usize) -> Self {
        self.nb_stacks = v;
        self
    }

    /// Enables or disables skip connections.
    pub fn use_skip_connections(mut self, v: bool) -> Self {
        self.use_skip_connections = v;
        self
    }

    /// Number of past time steps (including the current one) that can
    /// influence the output.
    pub fn receptive_field(&self) -> usize {
        let k = self.kernel_size.saturating_sub(1);
        1 + 2 * k * self.nb_stacks * self.dilations.iter().sum::<usize>()
    }
}

impl OutDim for TcnConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: i64) {
        self.out_dim = v;
    }
}
