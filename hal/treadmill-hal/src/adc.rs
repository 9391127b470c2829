//! Serial ADC word formats
//!
//! The supported converters (TI ADS7029, ADS7039 and ADS7049) clock out
//! two leading zeros followed by the conversion result, most significant
//! bit first. Only the data width differs between parts.

/// Leading zero bits before the data word
pub const LEADING_ZERO_BITS: u8 = 2;

/// Converter resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcResolution {
    /// 8-bit (ADS7029)
    Bits8,
    /// 10-bit (ADS7039)
    Bits10,
    /// 12-bit (ADS7049)
    #[default]
    Bits12,
}

impl AdcResolution {
    /// Parse a bit count
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(AdcResolution::Bits8),
            10 => Some(AdcResolution::Bits10),
            12 => Some(AdcResolution::Bits12),
            _ => None,
        }
    }

    /// Data bits per conversion
    pub fn bits(self) -> u8 {
        match self {
            AdcResolution::Bits8 => 8,
            AdcResolution::Bits10 => 10,
            AdcResolution::Bits12 => 12,
        }
    }

    /// Serial clocks needed for one frame
    pub fn frame_bits(self) -> u8 {
        self.bits() + LEADING_ZERO_BITS
    }

    /// Largest code the converter can produce
    pub fn max_code(self) -> u16 {
        (1u16 << self.bits()) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bits() {
        assert_eq!(AdcResolution::from_bits(8), Some(AdcResolution::Bits8));
        assert_eq!(AdcResolution::from_bits(10), Some(AdcResolution::Bits10));
        assert_eq!(AdcResolution::from_bits(12), Some(AdcResolution::Bits12));
        assert_eq!(AdcResolution::from_bits(16), None);
        assert_eq!(AdcResolution::from_bits(0), None);
    }

    #[test]
    fn test_frame_shape() {
        assert_eq!(AdcResolution::Bits12.frame_bits(), 14);
        assert_eq!(AdcResolution::Bits8.frame_bits(), 10);
        assert_eq!(AdcResolution::Bits12.max_code(), 4095);
        assert_eq!(AdcResolution::Bits10.max_code(), 1023);
        assert_eq!(AdcResolution::default(), AdcResolution::Bits12);
    }
}
