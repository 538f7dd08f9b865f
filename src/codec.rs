//! Wire JSON codec for command definitions.
//!
//! Decode accepts the full historical schema: fields missing from old
//! definitions default (`repeatCount`/`repeatInterval`/`addr`/`cmd`/`rpt`
//! to 0, `freq` to 38, `proto` to "NEC"), a `raw: true` flag selects the
//! raw variant, and over-long `data` arrays are truncated to the first
//! [`MAX_RAW_SAMPLES`] entries rather than rejected.
//!
//! Encode produces exactly one of two canonical shapes:
//!
//! ```text
//! {"proto":"Samsung","addr":7,"cmd":7,"rpt":0,"repeatCount":1,"repeatInterval":110}
//! {"raw":true,"freq":38,"data":[1330,270,...],"repeatCount":0,"repeatInterval":0}
//! ```

use serde::{Deserialize, Serialize};

use crate::command::{CommandKind, CommandPayload, ProtoName, RawTimings, MAX_RAW_SAMPLES};
use crate::error::CodecError;

/// Carrier assumed when a raw definition omits `freq` (kHz).
pub const DEFAULT_CARRIER_KHZ: u8 = 38;

/// Protocol assumed when a definition omits `proto`.
pub const DEFAULT_PROTO: &str = "NEC";

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

fn default_freq() -> u8 {
    DEFAULT_CARRIER_KHZ
}

fn default_proto() -> String {
    DEFAULT_PROTO.to_owned()
}

/// Lenient inbound shape: every field optional, both variants overlaid.
#[derive(Deserialize)]
struct WireIn {
    #[serde(default)]
    raw: bool,
    #[serde(default = "default_proto")]
    proto: String,
    #[serde(default)]
    addr: u16,
    #[serde(default)]
    cmd: u16,
    #[serde(default)]
    rpt: u8,
    #[serde(default = "default_freq")]
    freq: u8,
    #[serde(default)]
    data: Vec<u16>,
    #[serde(default, rename = "repeatCount")]
    repeat_count: u8,
    #[serde(default, rename = "repeatInterval")]
    repeat_interval: u16,
}

/// Cut a string at a byte limit without splitting a UTF-8 sequence.
fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Parse a definition payload into a [`CommandPayload`].
pub fn decode(payload: &str) -> Result<CommandPayload, CodecError> {
    let wire: WireIn = serde_json::from_str(payload).map_err(|_| CodecError::InvalidJson)?;

    let kind = if wire.raw {
        let mut timings = RawTimings::new();
        // Truncation, not an error: keep the first MAX_RAW_SAMPLES entries.
        for &t in wire.data.iter().take(MAX_RAW_SAMPLES) {
            let _ = timings.push(t);
        }
        CommandKind::Raw {
            carrier_khz: wire.freq,
            timings,
        }
    } else {
        let proto = ProtoName::try_from(truncate_to(&wire.proto, crate::command::MAX_PROTO_BYTES))
            .unwrap_or_default();
        CommandKind::Protocol {
            proto,
            addr: wire.addr,
            cmd: wire.cmd,
            rpt: wire.rpt,
        }
    };

    Ok(CommandPayload {
        kind,
        repeat_count: wire.repeat_count,
        repeat_interval_ms: wire.repeat_interval,
    })
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ProtocolWire<'a> {
    proto: &'a str,
    addr: u16,
    cmd: u16,
    rpt: u8,
    #[serde(rename = "repeatCount")]
    repeat_count: u8,
    #[serde(rename = "repeatInterval")]
    repeat_interval: u16,
}

#[derive(Serialize)]
struct RawWire<'a> {
    raw: bool,
    freq: u8,
    data: &'a [u16],
    #[serde(rename = "repeatCount")]
    repeat_count: u8,
    #[serde(rename = "repeatInterval")]
    repeat_interval: u16,
}

/// Serialize a payload into its canonical definition JSON.
pub fn encode(payload: &CommandPayload) -> Result<String, CodecError> {
    let json = match &payload.kind {
        CommandKind::Protocol {
            proto,
            addr,
            cmd,
            rpt,
        } => serde_json::to_string(&ProtocolWire {
            proto: proto.as_str(),
            addr: *addr,
            cmd: *cmd,
            rpt: *rpt,
            repeat_count: payload.repeat_count,
            repeat_interval: payload.repeat_interval_ms,
        }),
        CommandKind::Raw {
            carrier_khz,
            timings,
        } => serde_json::to_string(&RawWire {
            raw: true,
            freq: *carrier_khz,
            data: timings.as_slice(),
            repeat_count: payload.repeat_count,
            repeat_interval: payload.repeat_interval_ms,
        }),
    };
    json.map_err(|_| CodecError::Serialize)
}

// ---------------------------------------------------------------------------
// Learn log (informational, non-retained)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ProtocolLog<'a> {
    name: &'a str,
    proto: &'a str,
    addr: u16,
    cmd: u16,
}

#[derive(Serialize)]
struct RawLog<'a> {
    name: &'a str,
    raw: bool,
    len: usize,
}

/// Serialize the learn-log line for a freshly learned command.
pub fn encode_learn_log(name: &str, payload: &CommandPayload) -> Result<String, CodecError> {
    let json = match &payload.kind {
        CommandKind::Protocol {
            proto, addr, cmd, ..
        } => serde_json::to_string(&ProtocolLog {
            name,
            proto: proto.as_str(),
            addr: *addr,
            cmd: *cmd,
        }),
        CommandKind::Raw { timings, .. } => serde_json::to_string(&RawLog {
            name,
            raw: true,
            len: timings.len(),
        }),
    };
    json.map_err(|_| CodecError::Serialize)
}
