//! Board configuration embedded at build time
//!
//! build.rs validates `board.toml` and stores it as postcard bytes; the
//! bytes are decoded and validated again here so a stale or truncated
//! blob can never configure the hardware.

use treadmill_core::{BoardConfig, ConfigError};

static BOARD_CONFIG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/board_config.bin"));

/// Decode and validate the embedded configuration
pub fn load() -> Result<BoardConfig, ConfigError> {
    let config: BoardConfig =
        postcard::from_bytes(BOARD_CONFIG).map_err(|_| ConfigError::Corrupted)?;
    config.validate()?;
    Ok(config)
}
