//! Layout of mixed kinematic/force-torque state vectors.
use crate::error::WaveFtError;
use serde::{Deserialize, Serialize};

/// Number of entries describing the end-effector position.
const POSITION_DIM: usize = 6;

/// Number of entries describing the end-effector velocity.
const VELOCITY_DIM: usize = 6;

/// Entries between the velocity and the previous action.
const EXTRA_DIM: usize = 3;

/// Number of channels of a force/torque sensor reading.
const FT_CHANNELS: usize = 6;

/// Describes how a flat state vector is split into its two modalities.
///
/// A state of length `kinematic_dim + ft_len * ft_channels` starts with the
/// kinematic slice. The rest is a time-major series: time step `t`, channel
/// `c` is stored at `kinematic_dim + t * ft_channels + c`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct StateLayout {
    /// Length of the kinematic slice.
    pub kinematic_dim: usize,

    /// Number of sensor channels per time step.
    pub ft_channels: usize,
}

impl StateLayout {
    /// Creates a layout.
    pub fn new(kinematic_dim: usize, ft_channels: usize) -> Self {
        Self {
            kinematic_dim,
            ft_channels,
        }
    }

    /// Layout of a robot state made of position, velocity, three extra
    /// entries and the previous action, followed by 6-axis F/T readings.
    pub fn for_action_dim(action_dim: usize) -> Self {
        Self::new(
            POSITION_DIM + VELOCITY_DIM + EXTRA_DIM + action_dim,
            FT_CHANNELS,
        )
    }

    /// Returns the number of force/torque time steps in a state vector of
    /// length `state_dim`.
    pub fn ft_len(&self, state_dim: usize) -> Result<usize, WaveFtError> {
        if self.ft_channels == 0 {
            return Err(WaveFtError::InvalidConfig(
                "ft_channels must be positive".to_string(),
            ));
        }
        if state_dim <= self.kinematic_dim {
            return Err(WaveFtError::MissingTimeSeries {
                state_dim,
                kinematic_dim: self.kinematic_dim,
            });
        }

        let len = state_dim - self.kinematic_dim;
        if len % self.ft_channels != 0 {
            return Err(WaveFtError::RaggedTimeSeries {
                len,
                ft_channels: self.ft_channels,
            });
        }

        Ok(len / self.ft_channels)
    }

    /// Returns the length of a state vector holding `ft_len` time steps.
    pub fn state_dim(&self, ft_len: usize) -> usize {
        self.kinematic_dim + ft_len * self.ft_channels
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_robot_layout() {
        let layout = StateLayout::for_action_dim(6);
        assert_eq!(layout.kinematic_dim, 21);
        assert_eq!(layout.ft_channels, 6);
        assert_eq!(layout.state_dim(12), 93);
        assert_eq!(layout.ft_len(93), Ok(12));
    }

    #[test]
    fn test_missing_time_series() {
        let layout = StateLayout::new(4, 6);
        assert_eq!(
            layout.ft_len(4),
            Err(WaveFtError::MissingTimeSeries {
                state_dim: 4,
                kinematic_dim: 4
            })
        );
        assert!(layout.ft_len(2).is_err());
    }

    #[test]
    fn test_ragged_time_series() {
        let layout = StateLayout::new(4, 6);
        assert_eq!(
            layout.ft_len(15),
            Err(WaveFtError::RaggedTimeSeries {
                len: 11,
                ft_channels: 6
            })
        );
    }

    #[test]
    fn test_zero_channels() {
        let layout = StateLayout::new(4, 0);
        assert!(matches!(
            layout.ft_len(10),
            Err(WaveFtError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_yaml() -> anyhow::Result<()> {
        let layout = StateLayout::new(17, 6);
        let s = serde_yaml::to_string(&layout)?;
        let layout_: StateLayout = serde_yaml::from_str(&s)?;
        assert_eq!(layout, layout_);
        Ok(())
    }
}
