//! Harp register contract
//!
//! The treadmill is a Harp device: the host reads and writes numbered
//! registers, and the device answers each access and pushes unsolicited
//! EVENT messages. Framing, checksums and timestamps belong to the Harp
//! core transport and are out of scope here. This crate only defines the
//! pieces the application exchanges with that transport:
//!
//! ```text
//!  host ──► RegisterCommand { READ|WRITE, address, type, payload }
//!  host ◄── Reply { READ|WRITE|EVENT|WRITE_ERROR, address, type, payload }
//! ```
//!
//! Payloads are little-endian arrays of the element type named by
//! [`PayloadType`].

#![no_std]
#![deny(unsafe_code)]

pub mod host;
pub mod message;
pub mod register;

pub use host::RegisterHost;
pub use message::{MessageType, PayloadType};
pub use register::{CommandKind, PayloadError, RegisterCommand, Reply, MAX_PAYLOAD_SIZE};
