//! Configuration types
//!
//! Board configuration is authored as TOML, validated on the host at
//! build time and shipped to the firmware as postcard bytes. See
//! [`BoardConfig`] for the reference defaults.

mod board;

pub use board::{
    AdcPins, BoardConfig, ConfigError, DacPins, DeviceIdentity, PinMap, SafetyBand, Version,
    MAX_DEVICE_NAME_LEN, MAX_EVENT_HZ_LIMIT, NUM_GPIO,
};
