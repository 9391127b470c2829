//! Transport seam
//!
//! The application never touches the wire. It hands finished replies to
//! a [`RegisterHost`] and asks it whether event output is muted.

use crate::register::Reply;

/// Outbound half of the Harp transport
pub trait RegisterHost {
    /// Queue a reply or event for the host
    fn send_reply(&mut self, reply: &Reply);

    /// True while the host has muted event output
    ///
    /// Replies to explicit reads and writes are still sent when muted.
    fn is_muted(&self) -> bool;
}
