//! Board-agnostic control logic for the treadmill controller
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Board configuration types and validation
//! - Tare offsets for the encoder, torque and brake current channels
//! - Torque-limit safety monitor (low-pass filter + trip latch)
//! - Wraparound-safe deadlines and the telemetry dispatch rate
//! - Application register table
//! - The control loop that ties them to the HAL and host traits

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod control;
pub mod registers;
pub mod safety;
pub mod scheduler;
pub mod tare;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{BoardConfig, ConfigError};
pub use control::{ControlLoop, LoopSettings, PollOutcome, RegisterError};
pub use registers::{AppRegister, AppRegisters};
pub use safety::{MonitorState, TorqueLimiter};
pub use scheduler::{Deadline, DispatchRate};
pub use tare::{RawReadings, TareOffsets};
