//! Register accesses and replies

use heapless::Vec;

use crate::message::{MessageType, PayloadType};

/// Largest register payload in bytes
pub const MAX_PAYLOAD_SIZE: usize = 16;

/// Payload validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Payload exceeds [`MAX_PAYLOAD_SIZE`]
    TooLarge,
    /// Length is not a whole number of elements
    PartialElement,
    /// Element type differs from the register's type
    TypeMismatch,
    /// Element count differs from the register's width
    LengthMismatch,
}

/// Host access kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    Read,
    Write,
}

fn checked_payload(
    payload_type: PayloadType,
    bytes: &[u8],
) -> Result<Vec<u8, MAX_PAYLOAD_SIZE>, PayloadError> {
    if bytes.len() % payload_type.element_size() != 0 {
        return Err(PayloadError::PartialElement);
    }
    Vec::from_slice(bytes).map_err(|_| PayloadError::TooLarge)
}

/// A register access received from the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterCommand {
    pub kind: CommandKind,
    pub address: u8,
    pub payload_type: PayloadType,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl RegisterCommand {
    /// Read request; carries no payload
    pub fn read(address: u8, payload_type: PayloadType) -> Self {
        Self {
            kind: CommandKind::Read,
            address,
            payload_type,
            payload: Vec::new(),
        }
    }

    /// Write request
    pub fn write(address: u8, payload_type: PayloadType, bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(Self {
            kind: CommandKind::Write,
            address,
            payload_type,
            payload: checked_payload(payload_type, bytes)?,
        })
    }

    /// Borrow the payload if it has exactly the expected shape
    pub fn expect_payload(&self, payload_type: PayloadType, bytes: usize) -> Result<&[u8], PayloadError> {
        if self.payload_type != payload_type {
            return Err(PayloadError::TypeMismatch);
        }
        if self.payload.len() != bytes {
            return Err(PayloadError::LengthMismatch);
        }
        Ok(&self.payload)
    }
}

/// A message from the device to the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reply {
    pub message_type: MessageType,
    pub address: u8,
    pub payload_type: PayloadType,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Reply {
    /// Build a reply from raw little-endian payload bytes
    pub fn new(
        message_type: MessageType,
        address: u8,
        payload_type: PayloadType,
        bytes: &[u8],
    ) -> Result<Self, PayloadError> {
        Ok(Self {
            message_type,
            address,
            payload_type,
            payload: checked_payload(payload_type, bytes)?,
        })
    }

    /// Number of payload elements
    pub fn element_count(&self) -> usize {
        self.payload.len() / self.payload_type.element_size()
    }
}
