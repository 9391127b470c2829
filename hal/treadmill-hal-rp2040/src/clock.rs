//! Microsecond clock backed by the embassy time driver

use embassy_time::Instant;
use treadmill_hal::Clock;

/// [`Clock`] reading the RP2040 timer through embassy-time
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_us(&self) -> u32 {
        // Truncation gives the wrapping 32-bit view the scheduler expects
        Instant::now().as_micros() as u32
    }
}
