//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum WaveFtError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The state vector does not contain any force/torque step.
    #[error("state dimension {state_dim} leaves no room for force/torque readings after {kinematic_dim} kinematic entries")]
    MissingTimeSeries {
        /// Length of the state vector.
        state_dim: usize,
        /// Length of the kinematic slice.
        kinematic_dim: usize,
    },

    /// The force/torque part is not a whole number of time steps.
    #[error("force/torque part of length {len} is not a multiple of {ft_channels} channels")]
    RaggedTimeSeries {
        /// Length of the force/torque part.
        len: usize,
        /// Number of sensor channels per time step.
        ft_channels: usize,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
