//! MQTT control-channel adapter.
//!
//! Owns the broker connection, the subscriptions, and the last-will
//! registration, and implements [`PublishPort`] for the service core.
//! Inbound publishes arrive on the client's event callback thread and are
//! handed to the single-threaded main loop through an mpsc channel, which
//! preserves broker delivery order.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`** — `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets** — records outbound publishes in memory and lets
//!   tests inject inbound traffic with [`MqttLink::sim_inject`].

use std::sync::mpsc::{channel, Receiver};
#[cfg(not(target_os = "espidf"))]
use std::sync::mpsc::Sender;

use log::debug;
#[cfg(target_os = "espidf")]
use log::{info, warn};

use crate::app::commands::InboundMessage;
use crate::app::events::Notification;
use crate::app::ports::PublishPort;
use crate::config::MqttSettings;
use crate::error::CommsError;
use crate::router::Topics;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};

/// Retained last-will payload, published by the broker on ungraceful drop.
const OFFLINE_PAYLOAD: &str = "offline";

pub struct MqttLink {
    topics: Topics,
    inbound: Receiver<(String, Vec<u8>)>,
    #[cfg(target_os = "espidf")]
    client: EspMqttClient<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim_inbound: Sender<(String, Vec<u8>)>,
    /// Outbound record for host tests: (topic, payload, retained).
    #[cfg(not(target_os = "espidf"))]
    pub published: Vec<(String, String, bool)>,
}

impl MqttLink {
    #[cfg(target_os = "espidf")]
    pub fn new(settings: &MqttSettings, topics: Topics) -> Result<Self, CommsError> {
        let (tx, rx) = channel::<(String, Vec<u8>)>();
        let state_topic = topics.state();
        let config = MqttClientConfiguration {
            client_id: Some(settings.client_id.as_str()),
            username: (!settings.username.is_empty()).then(|| settings.username.as_str()),
            password: (!settings.password.is_empty()).then(|| settings.password.as_str()),
            lwt: Some(LwtConfiguration {
                topic: state_topic.as_str(),
                payload: OFFLINE_PAYLOAD.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };
        let client = EspMqttClient::new_cb(settings.broker_url.as_str(), &config, move |event| {
            if let EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } = event.payload()
            {
                // Channel send only fails after the main loop is gone.
                let _ = tx.send((topic.to_owned(), data.to_vec()));
            }
        })
        .map_err(|err| {
            warn!("mqtt: client init failed: {}", err);
            CommsError::MqttConnectFailed
        })?;
        info!("mqtt: client up, will '{}' on {}", OFFLINE_PAYLOAD, topics.state());
        Ok(Self {
            topics,
            inbound: rx,
            client,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(_settings: &MqttSettings, topics: Topics) -> Result<Self, CommsError> {
        let (tx, rx) = channel();
        debug!(
            "mqtt(sim): will '{}' would be registered on {}",
            OFFLINE_PAYLOAD,
            topics.state()
        );
        Ok(Self {
            topics,
            inbound: rx,
            sim_inbound: tx,
            published: Vec::new(),
        })
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Subscribe to every inbound channel the bridge listens on.
    pub fn subscribe_all(&mut self) -> Result<(), CommsError> {
        for topic in [
            self.topics.send(),
            self.topics.listen(),
            self.topics.commands_filter(),
        ] {
            self.platform_subscribe(&topic)?;
            debug!("mqtt: subscribed {}", topic);
        }
        Ok(())
    }

    /// Pop the next classified inbound message, if any arrived.
    ///
    /// Publishes on foreign topics are dropped here.
    pub fn poll_inbound(&mut self) -> Option<InboundMessage> {
        while let Ok((topic, payload)) = self.inbound.try_recv() {
            match self.topics.route(&topic, &payload) {
                Some(msg) => return Some(msg),
                None => debug!("mqtt: ignoring {}", topic),
            }
        }
        None
    }

    /// Inject one inbound publish, as the broker would deliver it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject(&self, topic: &str, payload: &[u8]) {
        let _ = self.sim_inbound.send((topic.to_owned(), payload.to_vec()));
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.client.subscribe(topic, QoS::AtLeastOnce).map(|_| ()).map_err(|err| {
            warn!("mqtt: subscribe {} failed: {}", topic, err);
            CommsError::MqttSubscribeFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, _topic: &str) -> Result<(), CommsError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str, retain: bool) {
        if let Err(err) = self
            .client
            .publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes())
        {
            warn!("mqtt: publish {} failed: {}", topic, err);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str, retain: bool) {
        debug!("mqtt(sim): {} <- {} (retain={})", topic, payload, retain);
        self.published
            .push((topic.to_owned(), payload.to_owned(), retain));
    }
}

impl PublishPort for MqttLink {
    fn notify(&mut self, note: &Notification) {
        let topic = self.topics.state();
        self.platform_publish(&topic, &note.to_string(), false);
    }

    fn learn_log(&mut self, json: &str) {
        let topic = self.topics.learn();
        self.platform_publish(&topic, json, false);
    }

    fn store_definition(&mut self, name: &str, json: &str) {
        let topic = self.topics.command(name);
        self.platform_publish(&topic, json, true);
    }
}
