//! Topic layout and inbound message classification.
//!
//! All channels hang off one configurable base (default `home/ir/1`):
//!
//! | Topic                   | Direction | Meaning                                |
//! |-------------------------|-----------|----------------------------------------|
//! | `<base>/send`           | inbound   | replay a cached command by name        |
//! | `<base>/listen`         | inbound   | arm learning, payload `{"name":...}`   |
//! | `<base>/commands/<name>`| both      | retained definition (empty = delete)   |
//! | `<base>/state`          | outbound  | status / notification strings          |
//! | `<base>/learn`          | outbound  | learn log JSON (non-retained)          |

use crate::app::commands::InboundMessage;

/// Topic name builder for one bridge instance.
#[derive(Debug, Clone)]
pub struct Topics {
    base: heapless::String<64>,
}

impl Topics {
    pub fn new(base: &str) -> Self {
        Self {
            base: heapless::String::try_from(base).unwrap_or_default(),
        }
    }

    pub fn send(&self) -> String {
        format!("{}/send", self.base)
    }

    pub fn state(&self) -> String {
        format!("{}/state", self.base)
    }

    pub fn learn(&self) -> String {
        format!("{}/learn", self.base)
    }

    pub fn listen(&self) -> String {
        format!("{}/listen", self.base)
    }

    /// Subscription filter receiving every retained definition.
    pub fn commands_filter(&self) -> String {
        format!("{}/commands/#", self.base)
    }

    /// Definition topic for one named command.
    pub fn command(&self, name: &str) -> String {
        format!("{}/commands/{}", self.base, name)
    }

    /// Classify an inbound topic + payload into a queueable message.
    ///
    /// Returns `None` for topics outside the bridge's namespace and for
    /// definition topics whose name part is empty or spans levels.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<InboundMessage> {
        let text = || String::from_utf8_lossy(payload).into_owned();

        if topic == self.send() {
            return Some(InboundMessage::Send { name: text() });
        }
        if topic == self.listen() {
            return Some(InboundMessage::Arm { payload: text() });
        }

        let prefix = format!("{}/commands/", self.base);
        if let Some(name) = topic.strip_prefix(prefix.as_str()) {
            // Per-name addressing: exactly one level below commands/.
            if name.is_empty() || name.contains('/') {
                return None;
            }
            return Some(InboundMessage::Definition {
                name: name.to_owned(),
                payload: text(),
            });
        }

        None
    }
}
