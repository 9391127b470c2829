//! Torque-limit safety
//!
//! Filters raw torque and latches a trip when the filtered value leaves
//! the configured safe band.

pub mod limiter;

pub use limiter::{LimitCheck, MonitorState, TorqueFilter, TorqueLimiter};
