//! Outer-ring adapters: clock, WiFi station, and the MQTT control channel.

pub mod mqtt;
pub mod time;
pub mod wifi;
