//! System configuration parameters
//!
//! All tunable parameters for the irbridge firmware. The learning timeouts
//! and carrier default mirror the behaviour the Home Assistant side relies
//! on; change them only together with the automations that consume the
//! published definitions.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Learning ---
    /// Outer bound for one learning attempt (milliseconds). The deadline
    /// restarts at the first captured signal, not at the arm instant.
    pub learn_total_timeout_ms: u32,
    /// A capture ends once no matching signal arrives for this long
    /// (milliseconds).
    pub burst_idle_timeout_ms: u32,

    // --- Transmit ---
    /// Carrier frequency assumed for learned raw commands (kHz).
    pub default_carrier_khz: u8,

    // --- Transport ---
    /// MQTT topic base, e.g. `home/ir/1`. Channel topics are derived from
    /// this (`<base>/send`, `<base>/state`, `<base>/learn`, `<base>/listen`,
    /// `<base>/commands/<name>`).
    pub topic_base: heapless::String<64>,

    // --- Timing ---
    /// Control loop cadence (milliseconds).
    pub poll_interval_ms: u32,
    /// How long to drain retained definitions after subscribing before the
    /// `online` announcement (milliseconds).
    pub retained_drain_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            learn_total_timeout_ms: 10_000,
            burst_idle_timeout_ms: 500,
            default_carrier_khz: 38,
            topic_base: heapless::String::try_from("home/ir/1").unwrap_or_default(),
            poll_interval_ms: 10,
            retained_drain_ms: 500,
        }
    }
}

/// Broker connection settings for the espidf binary.
///
/// Credential provisioning is out of scope for this firmware; the defaults
/// are placeholders meant to be overridden at build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSettings {
    pub broker_url: heapless::String<128>,
    pub client_id: heapless::String<32>,
    pub username: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_url: heapless::String::try_from("mqtt://192.168.1.2:1883")
                .unwrap_or_default(),
            client_id: heapless::String::try_from("irbridge-1").unwrap_or_default(),
            username: heapless::String::new(),
            password: heapless::String::new(),
        }
    }
}
