//! Polled on-chip ADC sensing
//!
//! Boards without the external serial ADCs read torque and brake current
//! from the RP2040's own ADC. Each [`AnalogSense`] converts on request and
//! publishes the result to a sample cell, so the control loop reads the
//! same cell type whichever front end is fitted.
//!
//! RP2040 has one ADC with four external inputs:
//! - ADC0: GPIO26
//! - ADC1: GPIO27
//! - ADC2: GPIO28
//! - ADC3: GPIO29

use embassy_rp::adc::{Adc, AdcPin, Blocking, Channel};
use embassy_rp::gpio::{Pin, Pull};
use embassy_rp::Peri;
use treadmill_hal::SampleWriter;

use crate::error::DriverError;

/// External ADC input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    /// ADC0 on GPIO26
    Adc0,
    /// ADC1 on GPIO27
    Adc1,
    /// ADC2 on GPIO28
    Adc2,
    /// ADC3 on GPIO29
    Adc3,
}

impl AdcChannel {
    /// GPIO behind this input
    pub fn gpio(&self) -> u8 {
        match self {
            AdcChannel::Adc0 => 26,
            AdcChannel::Adc1 => 27,
            AdcChannel::Adc2 => 28,
            AdcChannel::Adc3 => 29,
        }
    }

    /// Input wired to a GPIO, if any
    pub fn from_gpio(gpio: u8) -> Option<Self> {
        match gpio {
            26 => Some(AdcChannel::Adc0),
            27 => Some(AdcChannel::Adc1),
            28 => Some(AdcChannel::Adc2),
            29 => Some(AdcChannel::Adc3),
            _ => None,
        }
    }
}

/// Tracks which inputs already have a sensor
#[derive(Debug, Default)]
pub struct AdcAllocator {
    allocated: [bool; 4],
}

impl AdcAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an input
    pub fn allocate(&mut self, channel: AdcChannel) -> Result<(), DriverError> {
        let idx = channel as usize;
        if self.allocated[idx] {
            Err(DriverError::AdcChannelInUse(channel.gpio()))
        } else {
            self.allocated[idx] = true;
            Ok(())
        }
    }

    /// Return an input to the pool
    pub fn release(&mut self, channel: AdcChannel) {
        self.allocated[channel as usize] = false;
    }

    pub fn is_allocated(&self, channel: AdcChannel) -> bool {
        self.allocated[channel as usize]
    }
}

/// One polled analog sensor publishing to a sample cell
pub struct AnalogSense<'d> {
    input: Channel<'d>,
    channel: AdcChannel,
    target: SampleWriter<'static>,
}

impl<'d> AnalogSense<'d> {
    /// Bind an ADC-capable pin to a claimed sample cell
    pub fn new<P: AdcPin + Pin>(
        allocator: &mut AdcAllocator,
        pin: Peri<'d, P>,
        target: SampleWriter<'static>,
    ) -> Result<Self, DriverError> {
        let gpio = pin.pin();
        let channel = AdcChannel::from_gpio(gpio).ok_or(DriverError::NotAnAdcPin(gpio))?;
        allocator.allocate(channel)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("analog: {} on GPIO{}", channel, gpio);

        Ok(Self {
            input: Channel::new_pin(pin, Pull::None),
            channel,
            target,
        })
    }

    pub fn channel(&self) -> AdcChannel {
        self.channel
    }

    /// Convert once and publish the result
    pub fn read_raw(&mut self, adc: &mut Adc<'_, Blocking>) -> Result<i16, DriverError> {
        let raw = adc
            .blocking_read(&mut self.input)
            .map_err(|_| DriverError::Conversion)?;
        // 12-bit result, always fits
        let value = raw as i16;
        self.target.publish(value);
        Ok(value)
    }

    /// Free the input in `allocator`
    pub fn release(self, allocator: &mut AdcAllocator) {
        allocator.release(self.channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpio_mapping() {
        for channel in [
            AdcChannel::Adc0,
            AdcChannel::Adc1,
            AdcChannel::Adc2,
            AdcChannel::Adc3,
        ] {
            assert_eq!(AdcChannel::from_gpio(channel.gpio()), Some(channel));
        }
        assert_eq!(AdcChannel::from_gpio(25), None);
        assert_eq!(AdcChannel::from_gpio(30), None);
    }

    #[test]
    fn test_allocator_exclusive() {
        let mut alloc = AdcAllocator::new();
        assert!(alloc.allocate(AdcChannel::Adc1).is_ok());
        assert!(alloc.is_allocated(AdcChannel::Adc1));
        assert_eq!(
            alloc.allocate(AdcChannel::Adc1),
            Err(DriverError::AdcChannelInUse(27))
        );
        alloc.release(AdcChannel::Adc1);
        assert!(alloc.allocate(AdcChannel::Adc1).is_ok());
    }
}
