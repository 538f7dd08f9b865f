//! Application core: wire-format-agnostic message handling and the
//! control-loop service orchestrating cache, learning, and transmission.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
