//! irbridge firmware — main entry point.
//!
//! Hexagonal layout: the service core ([`irbridge::app::service::IrService`])
//! is pure logic polled from this loop; the adapters on the outer ring own
//! the peripherals and the broker connection.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                 │
//! │                                                       │
//! │  WifiStation      MqttLink          IrTransceiver     │
//! │  (STA link)       (PublishPort,     (ReceiverPort +   │
//! │                    inbound queue)    TransmitPort)    │
//! │                                                       │
//! │  ───────────── Port Trait Boundary ─────────────      │
//! │                                                       │
//! │  ┌─────────────────────────────────────────────────┐  │
//! │  │           IrService (pure logic)                │  │
//! │  │  CommandStore · LearningSession · BurstJob      │  │
//! │  └─────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Boot order matters: subscriptions first, then a short drain window so
//! retained definitions repopulate the cache, then the `online`
//! announcement whose loaded-count reflects the drained cache.

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use irbridge::adapters::mqtt::MqttLink;
use irbridge::adapters::time::MonotonicClock;
use irbridge::adapters::wifi::WifiStation;
use irbridge::app::service::IrService;
use irbridge::config::{MqttSettings, SystemConfig};
use irbridge::drivers::ir::IrTransceiver;
use irbridge::drivers::status_led::LearnLed;
use irbridge::router::Topics;

// Build-time provisioning; override with e.g.
// `IRBRIDGE_WIFI_SSID=mynet cargo build`.
const WIFI_SSID: &str = match option_env!("IRBRIDGE_WIFI_SSID") {
    Some(v) => v,
    None => "irbridge-net",
};
const WIFI_PASSWORD: &str = match option_env!("IRBRIDGE_WIFI_PASSWORD") {
    Some(v) => v,
    None => "",
};
const MQTT_URL: &str = match option_env!("IRBRIDGE_MQTT_URL") {
    Some(v) => v,
    None => "mqtt://192.168.1.2:1883",
};

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("irbridge v{}", env!("CARGO_PKG_VERSION"));

    let config = SystemConfig::default();
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── Network ───────────────────────────────────────────────
    let mut wifi = WifiStation::new(peripherals.modem, sysloop, nvs)?;
    wifi.set_credentials(WIFI_SSID, WIFI_PASSWORD)?;
    while wifi.connect().is_err() {
        warn!("wifi not up yet, retrying");
        FreeRtos::delay_ms(2_000);
    }

    let settings = MqttSettings {
        broker_url: heapless::String::try_from(MQTT_URL).unwrap_or_default(),
        ..MqttSettings::default()
    };
    let topics = Topics::new(config.topic_base.as_str());
    let mut mqtt = MqttLink::new(&settings, topics)?;
    mqtt.subscribe_all()?;

    // ── Hardware and core ─────────────────────────────────────
    let mut ir = IrTransceiver::new(
        peripherals.rmt.channel0,
        peripherals.rmt.channel1,
        config.default_carrier_khz,
    )?;
    let mut led = LearnLed::new();
    let clock = MonotonicClock::new();
    let mut service = IrService::new(&config);

    // ── Retained drain ────────────────────────────────────────
    //
    // The broker replays every retained `commands/<name>` right after the
    // subscribe; give them a moment to land before declaring readiness.
    let drain_until = clock.now_ms() + u64::from(config.retained_drain_ms);
    while clock.now_ms() < drain_until {
        while let Some(msg) = mqtt.poll_inbound() {
            service.enqueue(msg);
        }
        service.poll(clock.now_ms(), &mut ir, &mut mqtt);
        FreeRtos::delay_ms(config.poll_interval_ms);
    }
    service.announce_online(&mut mqtt);
    info!("ready with {} cached commands", service.store().len());

    // ── Control loop ──────────────────────────────────────────
    loop {
        wifi.poll();
        while let Some(msg) = mqtt.poll_inbound() {
            service.enqueue(msg);
        }
        service.poll(clock.now_ms(), &mut ir, &mut mqtt);
        led.set(service.is_learning());
        FreeRtos::delay_ms(config.poll_interval_ms);
    }
}
