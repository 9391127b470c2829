//! Brake setpoint output
//!
//! The brake driver accepts a 16-bit setpoint. Boards drive it either
//! through an external DAC or through a filtered PWM pin.

/// Sink for 16-bit brake setpoints
pub trait SetpointOutput {
    /// Emit a new setpoint, replacing the previous one
    fn write_value(&mut self, value: u16);
}
