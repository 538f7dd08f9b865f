//! irbridge firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod learn;
pub mod router;
pub mod signal;
pub mod store;
pub mod transmit;

mod pins;

// Adapters and drivers build on every target; their platform halves are
// cfg-gated internally with in-memory simulations on host.
pub mod adapters;
pub mod drivers;
