//! PWM brake output
//!
//! Boards without the serial DAC drive the brake amplifier from a
//! filtered PWM pin. The counter wraps at [`PWM_TOP`] so the compare
//! value is the duty in percent.

use embassy_rp::pwm::{ChannelAPin, Config, Pwm, Slice};
use embassy_rp::Peri;
use fixed::types::U12F4;
use treadmill_hal::SetpointOutput;

use crate::timing::{
    pwm_divider_x16, pwm_frequency_or_default, setpoint_percent, PWM_TOP, SYS_CLK_HZ,
};

/// Duty-cycle brake output on a PWM channel A pin
pub struct PwmBrake<'d> {
    pwm: Pwm<'d>,
    config: Config,
    frequency_hz: u32,
}

impl<'d> PwmBrake<'d> {
    /// Start the carrier at 0 % duty
    ///
    /// Frequencies outside 5 kHz..=500 kHz fall back to 20 kHz.
    pub fn new<S: Slice>(
        slice: Peri<'d, S>,
        pin: Peri<'d, impl ChannelAPin<S>>,
        frequency_hz: u32,
    ) -> Self {
        let frequency_hz = pwm_frequency_or_default(frequency_hz);

        let mut config = Config::default();
        config.top = PWM_TOP;
        config.divider = U12F4::from_bits(pwm_divider_x16(SYS_CLK_HZ, frequency_hz));
        config.compare_a = 0;

        let pwm = Pwm::new_output_a(slice, pin, config.clone());

        #[cfg(feature = "defmt")]
        defmt::info!("brake: PWM at {} Hz", frequency_hz);

        Self {
            pwm,
            config,
            frequency_hz,
        }
    }

    /// Carrier frequency in use
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Duty in percent, clamped to 100
    pub fn set_duty_percent(&mut self, percent: u8) {
        self.config.compare_a = percent.min(100) as u16;
        self.pwm.set_config(&self.config);
    }

    pub fn duty_percent(&self) -> u8 {
        self.config.compare_a as u8
    }
}

impl SetpointOutput for PwmBrake<'_> {
    fn write_value(&mut self, value: u16) {
        self.set_duty_percent(setpoint_percent(value));
    }
}

impl Drop for PwmBrake<'_> {
    fn drop(&mut self) {
        self.set_duty_percent(0);
    }
}
