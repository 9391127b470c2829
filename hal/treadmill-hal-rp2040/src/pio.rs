//! PIO block helpers
//!
//! embassy-rp keeps the PIO register block and index behind a sealed
//! trait. The streaming drivers need both to point DMA at a state
//! machine's FIFOs, so [`PioBlock`] exposes them for PIO0 and PIO1.

use embassy_rp::pac;
use embassy_rp::peripherals::{PIO0, PIO1};
use embassy_rp::pio::{Instance, Pin};
use fixed::types::U24F8;

use crate::error::DriverError;
use crate::timing::pio_rx_dreq;

/// A PIO block whose FIFOs can be targeted by DMA
pub trait PioBlock: Instance {
    /// Block index (0 or 1)
    const INDEX: u8;

    /// Register block
    fn regs() -> pac::pio::Pio;

    /// Bus address of a state machine's RX FIFO
    fn rx_fifo_address(sm: usize) -> u32 {
        Self::regs().rxf(sm).as_ptr() as u32
    }

    /// DMA request line paced by a state machine's RX FIFO
    fn rx_dreq(sm: usize) -> u8 {
        pio_rx_dreq(Self::INDEX, sm as u8)
    }
}

impl PioBlock for PIO0 {
    const INDEX: u8 = 0;

    fn regs() -> pac::pio::Pio {
        pac::PIO0
    }
}

impl PioBlock for PIO1 {
    const INDEX: u8 = 1;

    fn regs() -> pac::pio::Pio {
        pac::PIO1
    }
}

/// Integer clock divider in the PIO's 16.8 format
pub fn integer_divider(divider: u32) -> U24F8 {
    // FixedU32<U8> has 24 integer bits and 8 fractional bits
    U24F8::from_bits(divider.clamp(1, 0xFFFF) << 8)
}

/// Check that `second` sits directly after `first`
///
/// `in pins, 2` and multi-pin side-set groups address consecutive GPIOs.
pub fn require_consecutive<PIO: Instance>(
    first: &Pin<'_, PIO>,
    second: &Pin<'_, PIO>,
) -> Result<(), DriverError> {
    if second.pin() == first.pin().wrapping_add(1) {
        Ok(())
    } else {
        Err(DriverError::PinsNotContiguous {
            first: first.pin(),
            second: second.pin(),
        })
    }
}
