//! Hardware drivers: the IR transceiver and the learn-status LED.

pub mod ir;
pub mod status_led;
