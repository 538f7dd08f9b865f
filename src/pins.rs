//! GPIO assignments for the irbridge board.
//!
//! Single source of truth — drivers reference this module rather than
//! hard-coding pin numbers.

/// IR emitter (through an NPN driver stage, active HIGH).
#[cfg(target_os = "espidf")]
pub const IR_SEND_GPIO: i32 = 13;

/// TSOP38238-style demodulating IR receiver, data output (active LOW).
#[cfg(target_os = "espidf")]
pub const IR_RECEIVE_GPIO: i32 = 27;

/// Onboard LED — lit while a learning session is armed or capturing.
pub const LEARN_LED_GPIO: i32 = 2;
