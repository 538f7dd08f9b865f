//! Learn-status LED driver.
//!
//! The onboard LED is lit for the whole life of a learning session (armed
//! through capturing) and off otherwise, mirroring
//! `IrService::is_learning`.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO directly via raw sys calls.
//! On host/test: tracks state in-memory only.

use crate::pins;

pub struct LearnLed {
    lit: bool,
}

impl Default for LearnLed {
    fn default() -> Self {
        Self::new()
    }
}

impl LearnLed {
    pub fn new() -> Self {
        platform_init();
        Self { lit: false }
    }

    /// Level changes only on transitions, so this is cheap to call per tick.
    pub fn set(&mut self, on: bool) {
        if on != self.lit {
            platform_set(on);
            self.lit = on;
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

#[cfg(target_os = "espidf")]
fn platform_init() {
    use esp_idf_svc::sys::*;
    // SAFETY: called once from main() before the control loop starts.
    unsafe {
        gpio_set_direction(pins::LEARN_LED_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT);
        gpio_set_level(pins::LEARN_LED_GPIO, 0);
    }
}

#[cfg(not(target_os = "espidf"))]
fn platform_init() {
    log::debug!("led(sim): GPIO{} configured", pins::LEARN_LED_GPIO);
}

#[cfg(target_os = "espidf")]
fn platform_set(on: bool) {
    // SAFETY: pin configured as output in platform_init; single-threaded
    // main-loop access only.
    unsafe {
        esp_idf_svc::sys::gpio_set_level(pins::LEARN_LED_GPIO, u32::from(on));
    }
}

#[cfg(not(target_os = "espidf"))]
fn platform_set(on: bool) {
    log::debug!("led(sim): {}", if on { "on" } else { "off" });
}
