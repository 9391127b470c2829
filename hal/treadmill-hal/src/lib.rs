//! Treadmill Hardware Abstraction Layer
//!
//! This crate defines the hardware seams the control logic is written
//! against. Chip-specific crates implement them with real peripherals,
//! and the core crate's tests implement them with fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  treadmill-core (control loop)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  treadmill-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!            ┌─────────────────┐
//!            │ treadmill-hal-  │
//!            │     rp2040      │
//!            └─────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`encoder::QuadratureCounter`] - Split request/fetch position counter
//! - [`output::SetpointOutput`] - Brake setpoint sink (DAC or PWM)
//! - [`clock::Clock`] - Free-running microsecond clock
//! - [`sample::SampleBuffer`] - Lock-free cells written by DMA or software
//! - [`adc::AdcResolution`] - Serial ADC word widths

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod clock;
pub mod encoder;
pub mod output;
pub mod sample;

pub use adc::AdcResolution;
pub use clock::Clock;
pub use encoder::{CountRequest, QuadratureCounter};
pub use output::SetpointOutput;
pub use sample::{CellError, DmaTarget, SampleBuffer, SampleCell, SampleWriter};
