//! Hardware and transport seams.
//!
//! The service core only ever talks to these traits; production adapters
//! wrap the RMT peripheral and the MQTT client, tests substitute mocks.

use crate::app::events::Notification;
use crate::signal::{DecodedSignal, Protocol};

/// IR receiver, active only while a learning session runs.
pub trait ReceiverPort {
    /// Enable capture. Idempotent.
    fn begin(&mut self);

    /// Disable capture and drop any pending frame. Idempotent.
    fn end(&mut self);

    /// Pop the next decoded frame, if one arrived since the last poll.
    fn decode(&mut self) -> Option<DecodedSignal>;
}

/// IR transmitter.
pub trait TransmitPort {
    /// Emit one protocol-encoded frame.
    fn send_protocol(&mut self, proto: Protocol, addr: u16, cmd: u16, rpt: u8);

    /// Replay raw mark/space timings at the given carrier frequency.
    fn send_raw(&mut self, carrier_khz: u8, timings: &[u16]);
}

/// Outbound control-channel publisher.
pub trait PublishPort {
    /// One-line status on the state channel.
    fn notify(&mut self, note: &Notification);

    /// Structured capture record on the learn channel (not retained).
    fn learn_log(&mut self, json: &str);

    /// Retained definition under the per-name command topic.
    fn store_definition(&mut self, name: &str, json: &str);
}
