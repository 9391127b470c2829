//! Reply log
//!
//! Drains the reply channel into the defmt log. A board with a Harp
//! transport attached consumes [`REPLIES`] there instead and leaves this
//! task unspawned.

use defmt::*;

use crate::channels::REPLIES;

#[embassy_executor::task]
pub async fn telemetry_task() {
    info!("Telemetry task started");

    loop {
        let reply = REPLIES.receive().await;
        trace!(
            "{} @{}: {} x {}",
            reply.message_type,
            reply.address,
            reply.element_count(),
            reply.payload_type
        );
    }
}
