//! PIO, DMA and PWM timing arithmetic
//!
//! Pure functions behind the drivers' clock dividers, DMA pacing signals
//! and output scaling, kept free of register access so they can be
//! checked on the host.
//!
//! # Serial timing
//!
//! The ADC program spends 4 PIO cycles per serial clock (2 high, 2 low)
//! plus a fixed 7 cycles of chip-select framing per conversion. The DAC
//! program spends 2 cycles per clock. Both run as fast as the device's
//! maximum SCK allows; the divider is rounded up so the limit is never
//! exceeded.

use treadmill_hal::AdcResolution;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// ADS70x9 maximum serial clock
pub const ADC_MAX_SCK_HZ: u32 = 32_000_000;

/// PIO cycles per ADC serial clock
pub const ADC_CYCLES_PER_BIT: u32 = 4;

/// PIO cycles of chip-select framing per ADC frame
pub const ADC_FRAME_OVERHEAD_CYCLES: u32 = 7;

/// LTC2641 maximum serial clock
pub const DAC_MAX_SCK_HZ: u32 = 50_000_000;

/// PIO cycles per DAC serial clock
pub const DAC_CYCLES_PER_BIT: u32 = 2;

/// DAC input word width
pub const DAC_WORD_BITS: u8 = 16;

/// PWM counter wrap; 100 steps give whole-percent duty
pub const PWM_TOP: u16 = 99;

/// Accepted PWM carrier range
pub const PWM_MIN_HZ: u32 = 5_000;
pub const PWM_MAX_HZ: u32 = 500_000;

/// Carrier used when the requested one is out of range
pub const PWM_DEFAULT_HZ: u32 = 20_000;

/// Smallest integer PIO clock divider that keeps SCK at or below `max_sck_hz`
pub fn spi_clock_divider(sys_clk_hz: u32, cycles_per_bit: u32, max_sck_hz: u32) -> u32 {
    let per_bit = cycles_per_bit as u64 * max_sck_hz as u64;
    if per_bit == 0 {
        return 1;
    }
    let divider = (sys_clk_hz as u64).div_ceil(per_bit);
    divider.clamp(1, 0xFFFF) as u32
}

/// Resulting serial clock
pub fn spi_clock_hz(sys_clk_hz: u32, cycles_per_bit: u32, divider: u32) -> u32 {
    sys_clk_hz / (cycles_per_bit * divider.max(1))
}

/// PIO cycles for one ADC conversion frame
pub fn adc_frame_cycles(resolution: AdcResolution) -> u32 {
    ADC_FRAME_OVERHEAD_CYCLES + ADC_CYCLES_PER_BIT * resolution.frame_bits() as u32
}

/// Conversions per second
pub fn adc_sample_rate_hz(sys_clk_hz: u32, divider: u32, resolution: AdcResolution) -> u32 {
    sys_clk_hz / divider.max(1) / adc_frame_cycles(resolution)
}

/// Value the ADC program's bit counter is loaded with
///
/// The loop runs `count + 1` times.
pub fn adc_bit_count(resolution: AdcResolution) -> u32 {
    resolution.frame_bits() as u32 - 1
}

/// Align a `bits`-wide code to the top of a 16-bit word
pub fn left_justify(value: u16, bits: u8) -> u16 {
    if bits == 0 || bits >= 16 {
        return value;
    }
    value << (16 - bits)
}

/// TX FIFO word for the DAC program; it shifts out MSB first from bit 31
pub fn dac_fifo_word(value: u16) -> u32 {
    (value as u32) << 16
}

/// DMA request line for a state machine's RX FIFO
pub fn pio_rx_dreq(pio: u8, sm: u8) -> u8 {
    pio * 8 + 4 + sm
}

/// PWM carrier to use for a requested frequency
pub fn pwm_frequency_or_default(freq_hz: u32) -> u32 {
    if (PWM_MIN_HZ..=PWM_MAX_HZ).contains(&freq_hz) {
        freq_hz
    } else {
        PWM_DEFAULT_HZ
    }
}

/// PWM clock divider in 8.4 fixed point for `freq_hz` with [`PWM_TOP`]
pub fn pwm_divider_x16(sys_clk_hz: u32, freq_hz: u32) -> u16 {
    let per_period = freq_hz as u64 * (PWM_TOP as u64 + 1);
    if per_period == 0 {
        return 0xFFF;
    }
    let x16 = sys_clk_hz as u64 * 16 / per_period;
    x16.clamp(16, 0xFFF) as u16
}

/// Duty in percent for a 16-bit setpoint
pub fn setpoint_percent(value: u16) -> u8 {
    ((value as u32 * 100 + 0x7FFF) / 0xFFFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_divider_at_default_clock() {
        let div = spi_clock_divider(SYS_CLK_HZ, ADC_CYCLES_PER_BIT, ADC_MAX_SCK_HZ);
        assert_eq!(div, 1);
        assert_eq!(spi_clock_hz(SYS_CLK_HZ, ADC_CYCLES_PER_BIT, div), 31_250_000);
    }

    #[test]
    fn test_dac_divider_rounds_up() {
        let div = spi_clock_divider(SYS_CLK_HZ, DAC_CYCLES_PER_BIT, DAC_MAX_SCK_HZ);
        assert_eq!(div, 2);
        assert!(spi_clock_hz(SYS_CLK_HZ, DAC_CYCLES_PER_BIT, div) <= DAC_MAX_SCK_HZ);
    }

    #[test]
    fn test_divider_overclocked() {
        let div = spi_clock_divider(200_000_000, ADC_CYCLES_PER_BIT, ADC_MAX_SCK_HZ);
        assert_eq!(div, 2);
    }

    #[test]
    fn test_adc_sample_rate() {
        assert_eq!(adc_frame_cycles(AdcResolution::Bits12), 63);
        assert_eq!(adc_sample_rate_hz(SYS_CLK_HZ, 1, AdcResolution::Bits12), 1_984_126);
        assert!(
            adc_sample_rate_hz(SYS_CLK_HZ, 1, AdcResolution::Bits8)
                > adc_sample_rate_hz(SYS_CLK_HZ, 1, AdcResolution::Bits12)
        );
    }

    #[test]
    fn test_adc_bit_count() {
        assert_eq!(adc_bit_count(AdcResolution::Bits12), 13);
        assert_eq!(adc_bit_count(AdcResolution::Bits8), 9);
    }

    #[test]
    fn test_left_justify() {
        assert_eq!(left_justify(0x0FFF, 12), 0xFFF0);
        assert_eq!(left_justify(0x0001, 12), 0x0010);
        assert_eq!(left_justify(0xABCD, 16), 0xABCD);
    }

    #[test]
    fn test_dac_fifo_word() {
        assert_eq!(dac_fifo_word(0x8000), 0x8000_0000);
        assert_eq!(dac_fifo_word(0x0001), 0x0001_0000);
    }

    #[test]
    fn test_dreq_numbers() {
        assert_eq!(pio_rx_dreq(0, 0), 4);
        assert_eq!(pio_rx_dreq(0, 3), 7);
        assert_eq!(pio_rx_dreq(1, 3), 15);
    }

    #[test]
    fn test_pwm_frequency_fallback() {
        assert_eq!(pwm_frequency_or_default(30_000), 30_000);
        assert_eq!(pwm_frequency_or_default(1_000), PWM_DEFAULT_HZ);
        assert_eq!(pwm_frequency_or_default(1_000_000), PWM_DEFAULT_HZ);
    }

    #[test]
    fn test_pwm_divider() {
        // 125 MHz / (20 kHz * 100) = 62.5
        assert_eq!(pwm_divider_x16(SYS_CLK_HZ, 20_000), 1000);
        // 125 MHz / (30 kHz * 100) = 41.67
        assert_eq!(pwm_divider_x16(SYS_CLK_HZ, 30_000), 666);
        assert_eq!(pwm_divider_x16(SYS_CLK_HZ, 500_000), 40);
    }

    #[test]
    fn test_setpoint_percent() {
        assert_eq!(setpoint_percent(0), 0);
        assert_eq!(setpoint_percent(u16::MAX), 100);
        assert_eq!(setpoint_percent(0x8000), 50);
    }
}
