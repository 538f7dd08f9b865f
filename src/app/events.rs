//! Status notifications published on the state channel.
//!
//! The rendered strings are a stable external contract consumed by
//! automations; every variant formats to exactly one line.

use core::fmt;

/// Outcome of handling a control message or a learning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Boot announcement after the retained cache drain.
    Online { loaded: usize },
    /// Learning armed for a name.
    LearnStart(String),
    /// A repeat burst matched the base signal; carries the running total.
    LearnBurstDetected(u16),
    /// Learning finished with a captured command.
    LearnSuccess { name: String, total_bursts: u16 },
    /// Learning expired with no signal at all.
    LearnTimeoutNoSignal,
    /// A replay completed every burst.
    Sent(String),
    /// A definition was stored (added or overwritten).
    Cached(String),
    /// A definition was removed by an empty retained payload.
    Deleted(String),
    /// Replay requested for a name not in the cache.
    NotFound(String),
    /// The cache is at capacity and a new entry was rejected.
    CacheFull,
    /// The listen payload was not valid JSON.
    InvalidJson,
    /// The listen payload had no usable `name` field.
    NoName,
    /// The requested learn name exceeds the stored-name limit.
    NameTooLong,
    /// A replay was requested with an empty name.
    EmptyCommandName,
    /// A definition payload failed to decode.
    BadDefinition(String),
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online { loaded } => write!(f, "online (loaded {} commands)", loaded),
            Self::LearnStart(name) => write!(f, "learn_start:{}", name),
            Self::LearnBurstDetected(total) => write!(f, "learn_burst_detected:{}", total),
            Self::LearnSuccess { name, total_bursts } => {
                if *total_bursts > 1 {
                    write!(f, "learn_success:{},bursts:{}", name, total_bursts)
                } else {
                    write!(f, "learn_success:{}", name)
                }
            }
            Self::LearnTimeoutNoSignal => write!(f, "learn_timeout:no_signal"),
            Self::Sent(name) => write!(f, "OK:{}", name),
            Self::Cached(name) => write!(f, "cached:{}", name),
            Self::Deleted(name) => write!(f, "deleted:{}", name),
            Self::NotFound(name) => write!(f, "ERR:NOT_FOUND:{}", name),
            Self::CacheFull => write!(f, "ERR:CACHE_FULL"),
            Self::InvalidJson => write!(f, "ERR:INVALID_JSON"),
            Self::NoName => write!(f, "ERR:NO_NAME"),
            Self::NameTooLong => write!(f, "ERR:NAME_TOO_LONG"),
            Self::EmptyCommandName => write!(f, "ERR:EMPTY_COMMAND_NAME"),
            Self::BadDefinition(name) => write!(f, "ERR:JSON:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_exact_contract_strings() {
        assert_eq!(
            Notification::Online { loaded: 4 }.to_string(),
            "online (loaded 4 commands)"
        );
        assert_eq!(
            Notification::LearnStart("tv".into()).to_string(),
            "learn_start:tv"
        );
        assert_eq!(
            Notification::LearnBurstDetected(3).to_string(),
            "learn_burst_detected:3"
        );
        assert_eq!(
            Notification::LearnTimeoutNoSignal.to_string(),
            "learn_timeout:no_signal"
        );
        assert_eq!(Notification::Sent("tv".into()).to_string(), "OK:tv");
        assert_eq!(Notification::Cached("tv".into()).to_string(), "cached:tv");
        assert_eq!(Notification::Deleted("tv".into()).to_string(), "deleted:tv");
        assert_eq!(
            Notification::NotFound("tv".into()).to_string(),
            "ERR:NOT_FOUND:tv"
        );
        assert_eq!(Notification::CacheFull.to_string(), "ERR:CACHE_FULL");
        assert_eq!(
            Notification::BadDefinition("tv".into()).to_string(),
            "ERR:JSON:tv"
        );
    }

    #[test]
    fn burst_count_suffix_only_for_multi_burst_captures() {
        assert_eq!(
            Notification::LearnSuccess {
                name: "tv".into(),
                total_bursts: 1
            }
            .to_string(),
            "learn_success:tv"
        );
        assert_eq!(
            Notification::LearnSuccess {
                name: "tv".into(),
                total_bursts: 4
            }
            .to_string(),
            "learn_success:tv,bursts:4"
        );
    }
}
