//! Harp message and payload type codes

// Message type IDs
pub const MSG_READ: u8 = 1;
pub const MSG_WRITE: u8 = 2;
pub const MSG_EVENT: u8 = 3;
pub const MSG_READ_ERROR: u8 = 9;
pub const MSG_WRITE_ERROR: u8 = 10;

// Payload type IDs. Bit 7 marks signed types, bit 6 marks floats and the
// low nibble is the element size in bytes.
pub const TYPE_U8: u8 = 0x01;
pub const TYPE_S8: u8 = 0x81;
pub const TYPE_U16: u8 = 0x02;
pub const TYPE_S16: u8 = 0x82;
pub const TYPE_U32: u8 = 0x04;
pub const TYPE_S32: u8 = 0x84;
pub const TYPE_U64: u8 = 0x08;
pub const TYPE_S64: u8 = 0x88;
pub const TYPE_FLOAT: u8 = 0x44;

/// Kind of a Harp message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageType {
    Read = MSG_READ,
    Write = MSG_WRITE,
    Event = MSG_EVENT,
    ReadError = MSG_READ_ERROR,
    WriteError = MSG_WRITE_ERROR,
}

impl MessageType {
    /// Get the type as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a type from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            MSG_READ => Some(MessageType::Read),
            MSG_WRITE => Some(MessageType::Write),
            MSG_EVENT => Some(MessageType::Event),
            MSG_READ_ERROR => Some(MessageType::ReadError),
            MSG_WRITE_ERROR => Some(MessageType::WriteError),
            _ => None,
        }
    }

    /// Error replies
    pub fn is_error(self) -> bool {
        matches!(self, MessageType::ReadError | MessageType::WriteError)
    }
}

/// Element type of a register payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PayloadType {
    U8 = TYPE_U8,
    S8 = TYPE_S8,
    U16 = TYPE_U16,
    S16 = TYPE_S16,
    U32 = TYPE_U32,
    S32 = TYPE_S32,
    U64 = TYPE_U64,
    S64 = TYPE_S64,
    Float = TYPE_FLOAT,
}

impl PayloadType {
    /// Get the type as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a type from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            TYPE_U8 => Some(PayloadType::U8),
            TYPE_S8 => Some(PayloadType::S8),
            TYPE_U16 => Some(PayloadType::U16),
            TYPE_S16 => Some(PayloadType::S16),
            TYPE_U32 => Some(PayloadType::U32),
            TYPE_S32 => Some(PayloadType::S32),
            TYPE_U64 => Some(PayloadType::U64),
            TYPE_S64 => Some(PayloadType::S64),
            TYPE_FLOAT => Some(PayloadType::Float),
            _ => None,
        }
    }

    /// Bytes per element
    pub fn element_size(self) -> usize {
        (self.as_u8() & 0x0F) as usize
    }

    /// Signed integer types
    pub fn is_signed(self) -> bool {
        self.as_u8() & 0x80 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_codes() {
        assert_eq!(MessageType::Read.as_u8(), 1);
        assert_eq!(MessageType::Event.as_u8(), 3);
        assert_eq!(MessageType::WriteError.as_u8(), 10);
        assert_eq!(MessageType::from_u8(2), Some(MessageType::Write));
        assert_eq!(MessageType::from_u8(4), None);
        assert!(MessageType::WriteError.is_error());
        assert!(!MessageType::Event.is_error());
    }

    #[test]
    fn test_payload_element_sizes() {
        assert_eq!(PayloadType::U8.element_size(), 1);
        assert_eq!(PayloadType::S16.element_size(), 2);
        assert_eq!(PayloadType::S32.element_size(), 4);
        assert_eq!(PayloadType::U64.element_size(), 8);
        assert_eq!(PayloadType::Float.element_size(), 4);
    }

    #[test]
    fn test_payload_signedness() {
        assert!(PayloadType::S8.is_signed());
        assert!(PayloadType::S32.is_signed());
        assert!(!PayloadType::U16.is_signed());
        assert!(!PayloadType::Float.is_signed());
    }

    #[test]
    fn test_unknown_payload_type() {
        assert_eq!(PayloadType::from_u8(0x03), None);
        assert_eq!(PayloadType::from_u8(0x84), Some(PayloadType::S32));
    }
}
