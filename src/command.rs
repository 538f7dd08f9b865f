//! In-memory command representation and size limits.
//!
//! A `StoredCommand` is a named IR action the bridge can replay. The payload
//! is a tagged variant: either a known-protocol triple (protocol name,
//! address, command) or a raw timing sequence with its carrier frequency.
//! Burst repetition is modelled exclusively via `repeat_count` /
//! `repeat_interval_ms`; the protocol-native repeat field (`rpt`) is carried
//! for wire compatibility and is 0 for everything the bridge learns itself.

// ---------------------------------------------------------------------------
// Size limits
// ---------------------------------------------------------------------------

/// Maximum number of cached commands.
pub const MAX_COMMANDS: usize = 30;

/// Maximum command name length in bytes (the wire rejects 32 and above).
pub const MAX_NAME_BYTES: usize = 31;

/// Maximum raw timing samples per command; excess wire data is truncated.
pub const MAX_RAW_SAMPLES: usize = 200;

/// Maximum protocol identifier length in bytes.
pub const MAX_PROTO_BYTES: usize = 15;

/// Bounded command name.
pub type CommandName = heapless::String<MAX_NAME_BYTES>;

/// Bounded protocol identifier, stored verbatim from the wire.
pub type ProtoName = heapless::String<MAX_PROTO_BYTES>;

/// Bounded raw timing sequence (microseconds, mark/space alternating).
pub type RawTimings = heapless::Vec<u16, MAX_RAW_SAMPLES>;

// ---------------------------------------------------------------------------
// Command payload
// ---------------------------------------------------------------------------

/// The two shapes an IR action can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Known-protocol command. The protocol identifier is kept as the
    /// verbatim wire string and parsed only at transmit time.
    Protocol {
        proto: ProtoName,
        addr: u16,
        cmd: u16,
        /// Protocol-native repeat count, normally 0.
        rpt: u8,
    },
    /// Raw timing replay at a fixed carrier frequency.
    Raw { carrier_khz: u8, timings: RawTimings },
}

/// Everything a command carries except its name — the unit the codec
/// decodes/encodes and the store writes into a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPayload {
    pub kind: CommandKind,
    /// Additional bursts beyond the first (0 = single burst).
    pub repeat_count: u8,
    /// Milliseconds between bursts; meaningful only if `repeat_count > 0`.
    pub repeat_interval_ms: u16,
}

/// A named, cached IR action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCommand {
    pub name: CommandName,
    pub payload: CommandPayload,
}

impl StoredCommand {
    /// Total bursts one replay produces.
    pub fn total_bursts(&self) -> u16 {
        1 + u16::from(self.payload.repeat_count)
    }
}
