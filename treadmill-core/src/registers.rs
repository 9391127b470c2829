//! Application register table
//!
//! Harp reserves addresses below 32 for the common device registers; the
//! treadmill's own registers start at [`APP_REG_START_ADDRESS`].
//!
//! | Addr | Register                    | Type | Access |
//! |------|-----------------------------|------|--------|
//! | 32   | encoder                     | S32  | R      |
//! | 33   | torque                      | S16  | R      |
//! | 34   | brake current               | S16  | R      |
//! | 35   | sensors [enc, torque, cur]  | S32×3| R      |
//! | 36   | dispatch frequency (Hz)     | U16  | RW     |
//! | 37   | brake setpoint              | U16  | RW     |
//! | 38   | tare bitmask                | U8   | RW     |
//! | 39   | reset-tare bitmask          | U8   | RW     |
//! | 40   | torque limiting enable      | U8   | RW     |
//! | 41   | torque limiting triggered   | U8   | RW     |

use heapless::Vec;
use treadmill_protocol::{PayloadError, PayloadType, MAX_PAYLOAD_SIZE};

/// First application register address
pub const APP_REG_START_ADDRESS: u8 = 32;

/// Application registers, keyed by address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AppRegister {
    Encoder = APP_REG_START_ADDRESS,
    Torque,
    BrakeCurrent,
    Sensors,
    DispatchFrequency,
    BrakeSetpoint,
    Tare,
    ResetTare,
    TorqueLimiting,
    TorqueLimitingTriggered,
}

impl AppRegister {
    /// Every register in address order
    pub const ALL: [AppRegister; 10] = [
        AppRegister::Encoder,
        AppRegister::Torque,
        AppRegister::BrakeCurrent,
        AppRegister::Sensors,
        AppRegister::DispatchFrequency,
        AppRegister::BrakeSetpoint,
        AppRegister::Tare,
        AppRegister::ResetTare,
        AppRegister::TorqueLimiting,
        AppRegister::TorqueLimitingTriggered,
    ];

    pub fn address(self) -> u8 {
        self as u8
    }

    pub fn from_address(address: u8) -> Option<Self> {
        let index = address.checked_sub(APP_REG_START_ADDRESS)?;
        Self::ALL.get(index as usize).copied()
    }

    pub fn payload_type(self) -> PayloadType {
        match self {
            AppRegister::Encoder | AppRegister::Sensors => PayloadType::S32,
            AppRegister::Torque | AppRegister::BrakeCurrent => PayloadType::S16,
            AppRegister::DispatchFrequency | AppRegister::BrakeSetpoint => PayloadType::U16,
            AppRegister::Tare
            | AppRegister::ResetTare
            | AppRegister::TorqueLimiting
            | AppRegister::TorqueLimitingTriggered => PayloadType::U8,
        }
    }

    /// Element count
    pub fn elements(self) -> usize {
        match self {
            AppRegister::Sensors => 3,
            _ => 1,
        }
    }

    /// Payload size in bytes
    pub fn byte_len(self) -> usize {
        self.elements() * self.payload_type().element_size()
    }

    /// Sensor readouts cannot be written
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            AppRegister::Encoder
                | AppRegister::Torque
                | AppRegister::BrakeCurrent
                | AppRegister::Sensors
        )
    }
}

/// Stored register values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppRegisters {
    pub encoder: i32,
    pub torque: i16,
    pub brake_current: i16,
    pub sensors: [i32; 3],
    pub dispatch_frequency: u16,
    pub brake_setpoint: u16,
    pub tare: u8,
    pub reset_tare: u8,
    pub torque_limiting: u8,
    pub torque_limiting_triggered: u8,
}

impl AppRegisters {
    /// Little-endian payload for a register
    pub fn encode(&self, register: AppRegister) -> Vec<u8, MAX_PAYLOAD_SIZE> {
        let mut out = Vec::new();
        let encoded = match register {
            AppRegister::Encoder => out.extend_from_slice(&self.encoder.to_le_bytes()),
            AppRegister::Torque => out.extend_from_slice(&self.torque.to_le_bytes()),
            AppRegister::BrakeCurrent => out.extend_from_slice(&self.brake_current.to_le_bytes()),
            AppRegister::Sensors => self
                .sensors
                .iter()
                .try_for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
            AppRegister::DispatchFrequency => {
                out.extend_from_slice(&self.dispatch_frequency.to_le_bytes())
            }
            AppRegister::BrakeSetpoint => out.extend_from_slice(&self.brake_setpoint.to_le_bytes()),
            AppRegister::Tare => out.push(self.tare).map_err(|_| ()),
            AppRegister::ResetTare => out.push(self.reset_tare).map_err(|_| ()),
            AppRegister::TorqueLimiting => out.push(self.torque_limiting).map_err(|_| ()),
            AppRegister::TorqueLimitingTriggered => {
                out.push(self.torque_limiting_triggered).map_err(|_| ())
            }
        };
        if encoded.is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("register {}: payload truncated", register.address());
            debug_assert!(false, "register {} exceeds MAX_PAYLOAD_SIZE", register.address());
        }
        out
    }
}

/// Decode a little-endian `u16` payload
pub fn le_u16(bytes: &[u8]) -> Result<u16, PayloadError> {
    bytes
        .try_into()
        .map(u16::from_le_bytes)
        .map_err(|_| PayloadError::LengthMismatch)
}

/// Decode a single-byte payload
pub fn le_u8(bytes: &[u8]) -> Result<u8, PayloadError> {
    match bytes {
        [value] => Ok(*value),
        _ => Err(PayloadError::LengthMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        assert_eq!(AppRegister::Encoder.address(), 32);
        assert_eq!(AppRegister::Sensors.address(), 35);
        assert_eq!(AppRegister::TorqueLimitingTriggered.address(), 41);
        for register in AppRegister::ALL {
            assert_eq!(AppRegister::from_address(register.address()), Some(register));
        }
        assert_eq!(AppRegister::from_address(31), None);
        assert_eq!(AppRegister::from_address(42), None);
        assert_eq!(AppRegister::from_address(0), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(AppRegister::Encoder.byte_len(), 4);
        assert_eq!(AppRegister::Torque.byte_len(), 2);
        assert_eq!(AppRegister::Sensors.byte_len(), 12);
        assert_eq!(AppRegister::BrakeSetpoint.byte_len(), 2);
        assert_eq!(AppRegister::Tare.byte_len(), 1);
    }

    #[test]
    fn test_encoded_length_matches_width() {
        let regs = AppRegisters::default();
        for register in AppRegister::ALL {
            assert_eq!(regs.encode(register).len(), register.byte_len());
        }
    }

    #[test]
    fn test_encode_sensors_little_endian() {
        let regs = AppRegisters {
            sensors: [1, -1, 0x0102_0304],
            ..Default::default()
        };
        assert_eq!(
            regs.encode(AppRegister::Sensors).as_slice(),
            &[1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 4, 3, 2, 1]
        );
    }

    #[test]
    fn test_read_only_set() {
        let read_only: usize = AppRegister::ALL.iter().filter(|r| r.is_read_only()).count();
        assert_eq!(read_only, 4);
        assert!(!AppRegister::BrakeSetpoint.is_read_only());
    }

    #[test]
    fn test_decode_helpers() {
        assert_eq!(le_u16(&[0xE8, 0x03]), Ok(1000));
        assert_eq!(le_u16(&[0xE8]), Err(PayloadError::LengthMismatch));
        assert_eq!(le_u8(&[7]), Ok(7));
        assert_eq!(le_u8(&[]), Err(PayloadError::LengthMismatch));
    }
}
