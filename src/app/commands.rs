//! Inbound control messages, already classified by topic.

/// One message pulled off the control channel, owned so it can sit in the
/// service queue while a transmission is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Replay the named cached command.
    Send { name: String },
    /// Arm a learning session; payload is the raw `{"name":...}` JSON.
    Arm { payload: String },
    /// Retained command definition; an empty payload deletes the entry.
    Definition { name: String, payload: String },
}
