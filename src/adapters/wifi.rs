//! WiFi station adapter.
//!
//! The bridge is a pure STA client: it joins one configured network and
//! stays on it, reconnecting with exponential backoff after a drop.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`** — real `esp_idf_svc::wifi` driver, blocking
//!   connect with netif-up wait.
//! - **all other targets** — in-memory simulation for host tests.

use log::{error, info, warn};

use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

fn valid_ssid(ssid: &str) -> bool {
    !ssid.is_empty() && ssid.len() <= 32 && ssid.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn valid_password(password: &str) -> bool {
    password.is_empty() || (8..=64).contains(&password.len())
}

pub struct WifiStation {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiStation {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, CommsError> {
        let wifi =
            EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|err| {
                error!("wifi: driver init failed: {}", err);
                CommsError::WifiConnectFailed
            })?;
        let driver = BlockingWifi::wrap(wifi, sysloop).map_err(|err| {
            error!("wifi: event loop wrap failed: {}", err);
            CommsError::WifiConnectFailed
        })?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            driver,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            sim_attempts: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        if !valid_ssid(ssid) || !valid_password(password) {
            error!("wifi: rejected credentials (ssid {} bytes)", ssid.len());
            return Err(CommsError::WifiConnectFailed);
        }
        self.ssid = heapless::String::try_from(ssid).map_err(|()| CommsError::WifiConnectFailed)?;
        self.password =
            heapless::String::try_from(password).map_err(|()| CommsError::WifiConnectFailed)?;
        info!("wifi: credentials set (ssid '{}')", self.ssid);
        Ok(())
    }

    /// One blocking connection attempt.
    pub fn connect(&mut self) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            return Err(CommsError::WifiConnectFailed);
        }
        if self.state == WifiState::Connected {
            return Ok(());
        }
        info!("wifi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                info!("wifi: connected");
                Ok(())
            }
            Err(err) => {
                error!("wifi: connect failed: {}", err);
                self.state = WifiState::Reconnecting { attempt: 0 };
                Err(err)
            }
        }
    }

    /// Drive reconnection. Call from the main loop; retries with backoff
    /// after a drop and is a no-op while connected.
    pub fn poll(&mut self) {
        match self.state {
            WifiState::Reconnecting { attempt } => {
                info!(
                    "wifi: reconnect attempt {} (backoff {}s)",
                    attempt, self.backoff_secs
                );
                match self.platform_connect() {
                    Ok(()) => {
                        self.state = WifiState::Connected;
                        self.backoff_secs = INITIAL_BACKOFF_SECS;
                        info!("wifi: reconnected");
                    }
                    Err(_) => {
                        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                        self.state = WifiState::Reconnecting { attempt: attempt + 1 };
                    }
                }
            }
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("wifi: link lost");
                    self.state = WifiState::Reconnecting { attempt: 0 };
                }
            }
            WifiState::Disconnected => {}
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            auth_method: if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        let attempt = || -> anyhow::Result<()> {
            self.driver.set_configuration(&config)?;
            if !self.driver.is_started().unwrap_or(false) {
                self.driver.start()?;
            }
            self.driver.connect()?;
            self.driver.wait_netif_up()?;
            Ok(())
        };
        attempt().map_err(|err| {
            warn!("wifi: {}", err);
            CommsError::WifiConnectFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        self.sim_attempts += 1;
        // Every 5th attempt fails to exercise the backoff path.
        if self.sim_attempts % 5 == 3 {
            warn!("wifi(sim): simulated failure (attempt {})", self.sim_attempts);
            return Err(CommsError::WifiConnectFailed);
        }
        info!("wifi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.driver.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}
