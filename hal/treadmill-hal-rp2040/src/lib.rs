//! RP2040 drivers for the treadmill controller
//!
//! This crate implements the `treadmill-hal` traits on RP2040 hardware.
//! The acquisition drivers run on PIO state machines and stream into
//! memory with DMA so the control loop never waits on a peripheral:
//!
//! - [`encoder::PioEncoder`] - quadrature counter with split request/fetch
//! - [`adc_stream::StreamingAdc`] - serial ADC streaming into a sample cell
//! - [`dac::PioDac`] - 16-bit serial DAC for the brake setpoint
//! - [`dma::ChainedStream`] - self-restarting DMA channel pair
//! - [`analog::AnalogSense`] - polled on-chip ADC for simpler boards
//! - [`pwm_brake::PwmBrake`] - PWM brake output for boards without a DAC
//! - [`clock::EmbassyClock`] - microsecond clock from the embassy time driver
//!
//! # Resource ownership
//!
//! State machines, DMA channels and pins are moved into the driver that
//! uses them, so two drivers can never share one. PIO programs may be
//! shared through an [`adc_stream::AdcProgram`] borrowed by several ADCs.
//! Dropping a driver halts its state machine before releasing its DMA
//! channels; freeing instruction memory is an explicit `release` step
//! because it needs the PIO block's `Common`.

#![no_std]

pub mod adc_stream;
pub mod analog;
pub mod clock;
pub mod dac;
pub mod dma;
pub mod encoder;
pub mod error;
pub mod pio;
pub mod pwm_brake;
pub mod timing;

pub use error::DriverError;

// Re-export shared traits from treadmill-hal for convenience
pub use treadmill_hal::{Clock, QuadratureCounter, SetpointOutput};
