#![warn(missing_docs)]
//! Backend-independent building blocks of the waveft policy.
//!
//! Observations handled by the policy are flat vectors holding a kinematic
//! slice followed by a time series of force/torque readings. [`StateLayout`]
//! describes how such a vector is split, while [`record`] provides the
//! key-value container used to report loss statistics.
pub mod error;
pub mod record;

mod layout;
pub use layout::StateLayout;
