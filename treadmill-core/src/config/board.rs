//! Board configuration
//!
//! Pin assignments, converter format, safety thresholds and device
//! identity for one treadmill board. `BoardConfig::default()` is the
//! reference board; a TOML file only needs to list what differs.

use heapless::String;
use treadmill_hal::AdcResolution;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPIO count on the RP2040
pub const NUM_GPIO: u8 = 30;

/// Highest event rate the transport can sustain
pub const MAX_EVENT_HZ_LIMIT: u16 = 1000;

/// Maximum device name length
pub const MAX_DEVICE_NAME_LEN: usize = 24;

const DEFAULT_DEVICE_NAME: &str = "Harp.Device.Treadmill";

const REFERENCE_TORQUE_ADC: AdcPins = AdcPins {
    cs: 9,
    sck: 11,
    data: 10,
};

const REFERENCE_CURRENT_ADC: AdcPins = AdcPins {
    cs: 18,
    sck: 20,
    data: 19,
};

const REFERENCE_HARDWARE: Version = Version {
    major: 0,
    minor: 2,
    patch: 1,
};

const REFERENCE_FIRMWARE: Version = Version {
    major: 0,
    minor: 1,
    patch: 1,
};

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pin number past the last GPIO
    InvalidPin(u8),
    /// Pin assigned to more than one function
    PinConflict(u8),
    /// ADC word width is not 8, 10 or 12 bits
    InvalidResolution(u8),
    /// Safety band is empty or exceeds the converter range
    InvalidSafetyBand,
    /// Max event rate outside 1..=1000 Hz
    InvalidEventRate(u16),
    /// Torque check interval is zero
    InvalidCheckInterval,
    /// postcard payload could not be decoded
    Corrupted,
}

/// Chip-select, clock and data pins for one serial ADC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdcPins {
    pub cs: u8,
    pub sck: u8,
    pub data: u8,
}

/// DAC clock and data pins
///
/// Chip select is always `sck + 1`; the PIO drives both from one
/// side-set group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DacPins {
    pub sck: u8,
    pub data: u8,
}

impl Default for DacPins {
    fn default() -> Self {
        Self { sck: 22, data: 21 }
    }
}

impl DacPins {
    /// Chip-select pin implied by the clock pin
    pub fn cs(&self) -> u8 {
        self.sck.saturating_add(1)
    }
}

/// Pin assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PinMap {
    /// Encoder channel A; channel B is the next pin
    pub encoder_a: u8,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "partial::torque_adc"))]
    pub torque_adc: AdcPins,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "partial::current_adc"))]
    pub current_adc: AdcPins,
    pub dac: DacPins,
}

impl PinMap {
    /// Encoder channel B
    pub fn encoder_b(&self) -> u8 {
        self.encoder_a.saturating_add(1)
    }

    /// Every pin the board claims, implied pins included
    pub fn all(&self) -> [u8; 11] {
        [
            self.encoder_a,
            self.encoder_b(),
            self.torque_adc.cs,
            self.torque_adc.sck,
            self.torque_adc.data,
            self.current_adc.cs,
            self.current_adc.sck,
            self.current_adc.data,
            self.dac.sck,
            self.dac.cs(),
            self.dac.data,
        ]
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            encoder_a: 16,
            torque_adc: REFERENCE_TORQUE_ADC,
            current_adc: REFERENCE_CURRENT_ADC,
            dac: DacPins::default(),
        }
    }
}

/// Raw torque range considered safe; the monitor trips at either bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SafetyBand {
    pub min: i16,
    pub max: i16,
}

impl SafetyBand {
    /// True when `value` is strictly inside the band
    pub fn contains(&self, value: i16) -> bool {
        value > self.min && value < self.max
    }
}

impl Default for SafetyBand {
    fn default() -> Self {
        Self { min: 100, max: 3995 }
    }
}

/// Major/minor/patch triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// Identity reported by the Harp transport
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceIdentity {
    pub who_am_i: u16,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "partial::hardware"))]
    pub hardware: Version,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "partial::firmware"))]
    pub firmware: Version,
    pub name: String<MAX_DEVICE_NAME_LEN>,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        let mut name = String::new();
        // Fits: checked by test_default_identity.
        let _ = name.push_str(DEFAULT_DEVICE_NAME);
        Self {
            who_am_i: 0x057A,
            hardware: REFERENCE_HARDWARE,
            firmware: REFERENCE_FIRMWARE,
            name,
        }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoardConfig {
    pub pins: PinMap,
    /// Serial ADC word width in bits (8, 10 or 12)
    pub adc_bits: u8,
    pub safety_band: SafetyBand,
    /// Upper bound for the dispatch frequency register
    pub max_event_hz: u16,
    /// Period of the torque-limit check
    pub torque_check_interval_us: u32,
    /// Largest accepted brake setpoint
    pub max_brake_setpoint: u16,
    pub identity: DeviceIdentity,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            pins: PinMap::default(),
            adc_bits: 12,
            safety_band: SafetyBand::default(),
            max_event_hz: MAX_EVENT_HZ_LIMIT,
            torque_check_interval_us: 1000,
            max_brake_setpoint: u16::MAX,
            identity: DeviceIdentity::default(),
        }
    }
}

impl BoardConfig {
    /// Converter format
    pub fn adc_resolution(&self) -> Result<AdcResolution, ConfigError> {
        AdcResolution::from_bits(self.adc_bits).ok_or(ConfigError::InvalidResolution(self.adc_bits))
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = self.pins.all();
        for (i, &pin) in pins.iter().enumerate() {
            if pin >= NUM_GPIO {
                return Err(ConfigError::InvalidPin(pin));
            }
            if pins[..i].contains(&pin) {
                return Err(ConfigError::PinConflict(pin));
            }
        }

        let resolution = self.adc_resolution()?;

        let band = self.safety_band;
        if band.min >= band.max || band.min < 0 || band.max as u16 > resolution.max_code() {
            return Err(ConfigError::InvalidSafetyBand);
        }

        if self.max_event_hz == 0 || self.max_event_hz > MAX_EVENT_HZ_LIMIT {
            return Err(ConfigError::InvalidEventRate(self.max_event_hz));
        }

        if self.torque_check_interval_us == 0 {
            return Err(ConfigError::InvalidCheckInterval);
        }

        Ok(())
    }
}

/// Field deserializers for tables whose reference value depends on where
/// they sit in the file
///
/// A partially written table keeps the reference value of every key it
/// leaves out. postcard carries complete values, so binary formats take the
/// derived path unchanged.
#[cfg(feature = "serde")]
mod partial {
    use serde::{Deserialize, Deserializer};

    use super::{
        AdcPins, Version, REFERENCE_CURRENT_ADC, REFERENCE_FIRMWARE, REFERENCE_HARDWARE,
        REFERENCE_TORQUE_ADC,
    };

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct AdcPinsTable {
        cs: Option<u8>,
        sck: Option<u8>,
        data: Option<u8>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct VersionTable {
        major: Option<u8>,
        minor: Option<u8>,
        patch: Option<u8>,
    }

    fn adc_pins<'de, D: Deserializer<'de>>(de: D, base: AdcPins) -> Result<AdcPins, D::Error> {
        if !de.is_human_readable() {
            return AdcPins::deserialize(de);
        }
        let table = AdcPinsTable::deserialize(de)?;
        Ok(AdcPins {
            cs: table.cs.unwrap_or(base.cs),
            sck: table.sck.unwrap_or(base.sck),
            data: table.data.unwrap_or(base.data),
        })
    }

    fn version<'de, D: Deserializer<'de>>(de: D, base: Version) -> Result<Version, D::Error> {
        if !de.is_human_readable() {
            return Version::deserialize(de);
        }
        let table = VersionTable::deserialize(de)?;
        Ok(Version {
            major: table.major.unwrap_or(base.major),
            minor: table.minor.unwrap_or(base.minor),
            patch: table.patch.unwrap_or(base.patch),
        })
    }

    pub(super) fn torque_adc<'de, D: Deserializer<'de>>(de: D) -> Result<AdcPins, D::Error> {
        adc_pins(de, REFERENCE_TORQUE_ADC)
    }

    pub(super) fn current_adc<'de, D: Deserializer<'de>>(de: D) -> Result<AdcPins, D::Error> {
        adc_pins(de, REFERENCE_CURRENT_ADC)
    }

    pub(super) fn hardware<'de, D: Deserializer<'de>>(de: D) -> Result<Version, D::Error> {
        version(de, REFERENCE_HARDWARE)
    }

    pub(super) fn firmware<'de, D: Deserializer<'de>>(de: D) -> Result<Version, D::Error> {
        version(de, REFERENCE_FIRMWARE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_board_is_valid() {
        assert_eq!(BoardConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_identity() {
        let id = DeviceIdentity::default();
        assert_eq!(id.who_am_i, 0x057A);
        assert_eq!(id.name.as_str(), DEFAULT_DEVICE_NAME);
        assert_eq!(id.hardware, Version { major: 0, minor: 2, patch: 1 });
    }

    #[test]
    fn test_implied_pins() {
        let pins = PinMap::default();
        assert_eq!(pins.encoder_b(), 17);
        assert_eq!(pins.dac.cs(), 23);
    }

    #[test]
    fn test_pin_out_of_range() {
        let mut config = BoardConfig::default();
        config.pins.encoder_a = 29;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPin(30)));
    }

    #[test]
    fn test_implied_cs_conflict() {
        let mut config = BoardConfig::default();
        config.pins.dac.sck = 8;
        assert_eq!(config.validate(), Err(ConfigError::PinConflict(9)));
    }

    #[test]
    fn test_shared_pin_conflict() {
        let mut config = BoardConfig::default();
        config.pins.current_adc.data = 10;
        assert_eq!(config.validate(), Err(ConfigError::PinConflict(10)));
    }

    #[test]
    fn test_bad_resolution() {
        let mut config = BoardConfig::default();
        config.adc_bits = 14;
        assert_eq!(config.validate(), Err(ConfigError::InvalidResolution(14)));
    }

    #[test]
    fn test_band_must_fit_resolution() {
        let mut config = BoardConfig::default();
        config.adc_bits = 10;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSafetyBand));

        config.safety_band = SafetyBand { min: 50, max: 1000 };
        assert_eq!(config.validate(), Ok(()));

        config.safety_band = SafetyBand { min: 500, max: 500 };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSafetyBand));
    }

    #[test]
    fn test_event_rate_bounds() {
        let mut config = BoardConfig::default();
        config.max_event_hz = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEventRate(0)));
        config.max_event_hz = 1001;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEventRate(1001)));
    }

    #[test]
    fn test_zero_check_interval() {
        let mut config = BoardConfig::default();
        config.torque_check_interval_us = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCheckInterval));
    }

    #[test]
    fn test_band_contains() {
        let band = SafetyBand::default();
        assert!(band.contains(2048));
        assert!(!band.contains(100));
        assert!(!band.contains(3995));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_round_trip() {
        let mut config = BoardConfig::default();
        config.pins.current_adc.data = 5;
        config.identity.firmware.minor = 4;
        let bytes = postcard::to_stdvec(&config).unwrap();
        let decoded: BoardConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_shipped_board_toml() {
        let config: BoardConfig =
            toml::from_str(include_str!("../../../treadmill-firmware/board.toml")).unwrap();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config, BoardConfig::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_empty_toml_is_reference_board() {
        let config: BoardConfig = toml::from_str("").unwrap();
        assert_eq!(config, BoardConfig::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_safety_band() {
        let config: BoardConfig = toml::from_str("[safety_band]\nmax = 3900\n").unwrap();
        assert_eq!(config.safety_band, SafetyBand { min: 100, max: 3900 });
        assert_eq!(config.validate(), Ok(()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_adc_tables() {
        let config: BoardConfig =
            toml::from_str("[pins.torque_adc]\ncs = 8\n\n[pins.current_adc]\ndata = 5\n")
                .unwrap();
        assert_eq!(config.pins.torque_adc, AdcPins { cs: 8, sck: 11, data: 10 });
        assert_eq!(config.pins.current_adc, AdcPins { cs: 18, sck: 20, data: 5 });
        assert_eq!(config.pins.dac, DacPins::default());
        assert_eq!(config.validate(), Ok(()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_dac_and_identity() {
        let config: BoardConfig = toml::from_str(
            "[pins.dac]\ndata = 2\n\n[identity]\nwho_am_i = 1\n\n[identity.hardware]\nminor = 3\n",
        )
        .unwrap();
        assert_eq!(config.pins.dac, DacPins { sck: 22, data: 2 });
        assert_eq!(config.identity.who_am_i, 1);
        assert_eq!(config.identity.name.as_str(), DEFAULT_DEVICE_NAME);
        assert_eq!(config.identity.hardware, Version { major: 0, minor: 3, patch: 1 });
        assert_eq!(config.identity.firmware, REFERENCE_FIRMWARE);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_errors_still_reported() {
        let result: Result<BoardConfig, _> = toml::from_str("[pins.torque_adc]\ncs = \"nine\"\n");
        assert!(result.is_err());
    }
}
