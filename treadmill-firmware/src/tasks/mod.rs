//! Embassy async tasks
//!
//! The control loop runs in one task and never waits; everything the host
//! sees leaves through the reply channel.

pub mod control;
pub mod telemetry;

pub use control::{control_task, Hardware, TreadmillLoop};
pub use telemetry::telemetry_task;
