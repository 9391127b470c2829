//! Tare offsets
//!
//! Each channel keeps a signed zero reference. Taring copies the current
//! raw reading into the offset; resetting zeroes it. Tared values are
//! computed from a copied raw value so a DMA overwrite between the read
//! and the subtraction cannot mix two samples.

/// Tare bitmask: encoder channel
pub const TARE_ENCODER: u8 = 1 << 0;
/// Tare bitmask: reaction torque channel
pub const TARE_TORQUE: u8 = 1 << 1;
/// Tare bitmask: brake current channel
pub const TARE_CURRENT: u8 = 1 << 2;
/// Every defined tare bit
pub const TARE_ALL: u8 = TARE_ENCODER | TARE_TORQUE | TARE_CURRENT;

/// Latest raw readings, copied out of their sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReadings {
    pub encoder: i32,
    pub torque: i16,
    pub current: i16,
}

/// Per-channel zero references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TareOffsets {
    encoder: i32,
    torque: i16,
    current: i16,
    active: u8,
}

impl TareOffsets {
    /// All offsets zero
    pub const fn new() -> Self {
        Self {
            encoder: 0,
            torque: 0,
            current: 0,
            active: 0,
        }
    }

    /// Capture the current raw value of every channel in `mask`
    ///
    /// Bits outside [`TARE_ALL`] are ignored.
    pub fn tare(&mut self, mask: u8, raw: &RawReadings) {
        if mask & TARE_ENCODER != 0 {
            self.encoder = raw.encoder;
        }
        if mask & TARE_TORQUE != 0 {
            self.torque = raw.torque;
        }
        if mask & TARE_CURRENT != 0 {
            self.current = raw.current;
        }
        self.active |= mask & TARE_ALL;
    }

    /// Zero the offset of every channel in `mask`
    pub fn reset(&mut self, mask: u8) {
        if mask & TARE_ENCODER != 0 {
            self.encoder = 0;
        }
        if mask & TARE_TORQUE != 0 {
            self.torque = 0;
        }
        if mask & TARE_CURRENT != 0 {
            self.current = 0;
        }
        self.active &= !(mask & TARE_ALL);
    }

    /// Set the encoder zero without marking the channel as tared
    ///
    /// Used at start-up so the position starts from 0.
    pub fn zero_encoder_at(&mut self, count: i32) {
        self.encoder = count;
    }

    /// Channels with a captured offset
    pub fn active(&self) -> u8 {
        self.active
    }

    pub fn encoder_offset(&self) -> i32 {
        self.encoder
    }

    pub fn torque_offset(&self) -> i16 {
        self.torque
    }

    pub fn current_offset(&self) -> i16 {
        self.current
    }

    /// Tared encoder position; counts wrap modulo 2^32
    pub fn encoder(&self, raw: i32) -> i32 {
        raw.wrapping_sub(self.encoder)
    }

    /// Tared torque
    pub fn torque(&self, raw: i16) -> i16 {
        raw.wrapping_sub(self.torque)
    }

    /// Tared brake current
    pub fn current(&self, raw: i16) -> i16 {
        raw.wrapping_sub(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(encoder: i32, torque: i16, current: i16) -> RawReadings {
        RawReadings {
            encoder,
            torque,
            current,
        }
    }

    #[test]
    fn test_tare_selected_channels_only() {
        let mut offsets = TareOffsets::new();
        offsets.tare(TARE_TORQUE, &raw(500, 2100, 300));
        assert_eq!(offsets.torque(2100), 0);
        assert_eq!(offsets.encoder(500), 500);
        assert_eq!(offsets.current(300), 300);
        assert_eq!(offsets.active(), TARE_TORQUE);
    }

    #[test]
    fn test_reset_clears_offset_and_bit() {
        let mut offsets = TareOffsets::new();
        offsets.tare(TARE_ALL, &raw(-40, 2000, 120));
        offsets.reset(TARE_ENCODER | TARE_CURRENT);
        assert_eq!(offsets.active(), TARE_TORQUE);
        assert_eq!(offsets.encoder(-40), -40);
        assert_eq!(offsets.current(120), 120);
        assert_eq!(offsets.torque(2000), 0);
    }

    #[test]
    fn test_unknown_bits_ignored() {
        let mut offsets = TareOffsets::new();
        offsets.tare(0xF8, &raw(1, 2, 3));
        assert_eq!(offsets, TareOffsets::new());
    }

    #[test]
    fn test_encoder_zero_is_not_a_tare() {
        let mut offsets = TareOffsets::new();
        offsets.zero_encoder_at(1234);
        assert_eq!(offsets.encoder(1234), 0);
        assert_eq!(offsets.active(), 0);
    }

    #[test]
    fn test_encoder_wraps() {
        let mut offsets = TareOffsets::new();
        offsets.tare(TARE_ENCODER, &raw(i32::MAX, 0, 0));
        assert_eq!(offsets.encoder(i32::MIN), 1);
    }

    proptest! {
        #[test]
        fn prop_tared_is_raw_minus_offset(
            at_tare in any::<(i32, i16, i16)>(),
            later in any::<(i32, i16, i16)>(),
            mask in 0u8..8,
        ) {
            let mut offsets = TareOffsets::new();
            let first = raw(at_tare.0, at_tare.1, at_tare.2);
            offsets.tare(mask, &first);

            if mask & TARE_ENCODER != 0 {
                prop_assert_eq!(offsets.encoder(first.encoder), 0);
            }
            if mask & TARE_TORQUE != 0 {
                prop_assert_eq!(offsets.torque(first.torque), 0);
            }
            if mask & TARE_CURRENT != 0 {
                prop_assert_eq!(offsets.current(first.current), 0);
            }

            prop_assert_eq!(offsets.encoder(later.0), later.0.wrapping_sub(offsets.encoder_offset()));
            prop_assert_eq!(offsets.torque(later.1), later.1.wrapping_sub(offsets.torque_offset()));
            prop_assert_eq!(offsets.current(later.2), later.2.wrapping_sub(offsets.current_offset()));
        }

        #[test]
        fn prop_reset_restores_raw(reading in any::<(i32, i16, i16)>(), mask in 0u8..8) {
            let mut offsets = TareOffsets::new();
            offsets.tare(TARE_ALL, &raw(reading.0, reading.1, reading.2));
            offsets.reset(mask);
            prop_assert_eq!(offsets.active(), TARE_ALL & !mask);
            if mask & TARE_TORQUE != 0 {
                prop_assert_eq!(offsets.torque(reading.1), reading.1);
            }
        }
    }
}
