//! Inter-task communication channels
//!
//! The Harp transport sits outside this firmware's control loop. It feeds
//! decoded register commands into [`COMMANDS`], drains [`REPLIES`] and
//! sets [`MUTED`] while the host has unsolicited events turned off.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicBool, Ordering};
use treadmill_protocol::{RegisterCommand, RegisterHost, Reply};

/// Channel capacity for incoming register commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for outgoing replies and events
const REPLY_CHANNEL_SIZE: usize = 16;

/// Register reads and writes from the host
pub static COMMANDS: Channel<CriticalSectionRawMutex, RegisterCommand, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Replies and events for the host
pub static REPLIES: Channel<CriticalSectionRawMutex, Reply, REPLY_CHANNEL_SIZE> = Channel::new();

/// Host has muted unsolicited events
pub static MUTED: AtomicBool = AtomicBool::new(false);

/// [`RegisterHost`] backed by the static channels
pub struct ChannelHost {
    dropped: u32,
}

impl ChannelHost {
    pub const fn new() -> Self {
        Self { dropped: 0 }
    }

    /// Replies lost to a full channel since start-up
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl RegisterHost for ChannelHost {
    fn send_reply(&mut self, reply: &Reply) {
        // Never wait here: the control loop must not stall on the host.
        if REPLIES.try_send(reply.clone()).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
    }

    fn is_muted(&self) -> bool {
        MUTED.load(Ordering::Relaxed)
    }
}
