//! Decoded IR signals and the burst-matching predicate.

use crate::command::RawTimings;

// ---------------------------------------------------------------------------
// Protocol identity
// ---------------------------------------------------------------------------

/// IR protocols the transmitter knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Samsung,
    Nec,
    Lg,
    Sony12,
    Jvc,
    Rc5,
    Rc6,
    Panasonic,
}

impl Protocol {
    /// Parse a wire protocol identifier, case-insensitively.
    /// Unrecognised names fall back to NEC.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "samsung" => Self::Samsung,
            "lg" => Self::Lg,
            "sony12" => Self::Sony12,
            "jvc" => Self::Jvc,
            "rc5" => Self::Rc5,
            "rc6" => Self::Rc6,
            "panasonic" => Self::Panasonic,
            _ => Self::Nec,
        }
    }

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Samsung => "Samsung",
            Self::Nec => "NEC",
            Self::Lg => "LG",
            Self::Sony12 => "Sony12",
            Self::Jvc => "JVC",
            Self::Rc5 => "RC5",
            Self::Rc6 => "RC6",
            Self::Panasonic => "Panasonic",
        }
    }
}

// ---------------------------------------------------------------------------
// Decoded signal
// ---------------------------------------------------------------------------

/// One demodulated transmission as delivered by the receiver.
///
/// `protocol == None` means the receiver could not classify the frame; such
/// signals are compared and replayed purely by their raw timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSignal {
    pub protocol: Option<Protocol>,
    pub address: u16,
    pub command: u16,
    /// Captured pulse timings (microseconds). Present for every signal;
    /// only used for storage/replay when the protocol is unknown.
    pub raw: RawTimings,
}

impl DecodedSignal {
    /// Number of captured raw samples.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }
}

/// Whether two signals are the same button press for burst-counting.
///
/// Known protocols compare address and command exactly. Unknown protocols
/// compare only the raw sample count; timing content is not compared.
pub fn signals_match(a: &DecodedSignal, b: &DecodedSignal) -> bool {
    if a.protocol != b.protocol {
        return false;
    }
    match a.protocol {
        Some(_) => a.address == b.address && a.command == b.command,
        None => a.raw_len() == b.raw_len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(addr: u16, cmd: u16) -> DecodedSignal {
        DecodedSignal {
            protocol: Some(Protocol::Samsung),
            address: addr,
            command: cmd,
            raw: RawTimings::new(),
        }
    }

    fn unknown(len: usize) -> DecodedSignal {
        let mut raw = RawTimings::new();
        for _ in 0..len {
            raw.push(560).unwrap();
        }
        DecodedSignal {
            protocol: None,
            address: 0,
            command: 0,
            raw,
        }
    }

    #[test]
    fn parse_is_case_insensitive_with_nec_fallback() {
        assert_eq!(Protocol::from_name("samsung"), Protocol::Samsung);
        assert_eq!(Protocol::from_name("SAMSUNG"), Protocol::Samsung);
        assert_eq!(Protocol::from_name("rc6"), Protocol::Rc6);
        assert_eq!(Protocol::from_name("NEC"), Protocol::Nec);
        assert_eq!(Protocol::from_name("definitely-not-a-protocol"), Protocol::Nec);
        assert_eq!(Protocol::from_name(""), Protocol::Nec);
    }

    #[test]
    fn name_roundtrips_through_parse() {
        for p in [
            Protocol::Samsung,
            Protocol::Nec,
            Protocol::Lg,
            Protocol::Sony12,
            Protocol::Jvc,
            Protocol::Rc5,
            Protocol::Rc6,
            Protocol::Panasonic,
        ] {
            assert_eq!(Protocol::from_name(p.name()), p);
        }
    }

    #[test]
    fn known_protocol_matches_on_addr_and_cmd() {
        assert!(signals_match(&known(7, 7), &known(7, 7)));
        assert!(!signals_match(&known(7, 7), &known(7, 11)));
        assert!(!signals_match(&known(7, 7), &known(8, 7)));
    }

    #[test]
    fn different_protocols_never_match() {
        let mut b = known(7, 7);
        b.protocol = Some(Protocol::Nec);
        assert!(!signals_match(&known(7, 7), &b));
        assert!(!signals_match(&known(7, 7), &unknown(4)));
    }

    #[test]
    fn unknown_protocol_matches_on_length_only() {
        let mut a = unknown(10);
        // Same length, different content still matches.
        a.raw[3] = 9999;
        assert!(signals_match(&a, &unknown(10)));
        assert!(!signals_match(&unknown(10), &unknown(11)));
    }
}
