//! Burst-detection learning session.
//!
//! A timer-driven state machine fed from the control loop:
//!
//! ```text
//!            arm(name)              first signal
//!   Idle ───────────────▶ Armed ─────────────────▶ Capturing ──┐
//!    ▲                      │                         │  ▲     │ matching signal
//!    │   deadline, no       │                         │  └─────┘ (burst += 1)
//!    │   signal seen        │     500 ms idle or      │
//!    ├──────────────────────┘     10 s deadline       │
//!    └────────────────────────────────────────────────┘
//! ```
//!
//! Remotes send one button press as several near-identical transmissions.
//! The session counts how many of those match the first captured signal and
//! averages their spacing, so replay can reproduce the full burst train.
//!
//! All timing comes in through `now_ms` parameters — no clock is read here,
//! which keeps every transition deterministic under test.

use log::{debug, info};

use crate::command::{CommandKind, CommandName, CommandPayload, ProtoName};
use crate::config::SystemConfig;
use crate::error::LearnError;
use crate::signal::{signals_match, DecodedSignal};

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// What a delivered signal did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent {
    /// Session idle, signal mismatched, or signal arrived outside the
    /// accept window — nothing changed.
    Ignored,
    /// First signal captured; it becomes the comparison template.
    FirstCapture,
    /// A matching burst was accepted. `total` counts the first signal too.
    BurstDetected { total: u16, interval_ms: u16 },
}

/// Terminal result of a learning attempt, produced by [`LearningSession::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The deadline passed without any signal at all.
    NoSignal { name: CommandName },
    /// A command was captured. `total_bursts` counts the first signal.
    Learned {
        name: CommandName,
        payload: CommandPayload,
        total_bursts: u16,
    },
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

enum SessionState {
    Idle,
    Armed {
        name: CommandName,
        deadline_ms: u64,
    },
    Capturing {
        name: CommandName,
        base: DecodedSignal,
        first_ms: u64,
        last_ms: u64,
        /// Additional matching signals beyond the first (saturating).
        bursts: u8,
        deadline_ms: u64,
    },
}

/// The single learning session. Exactly one exists per device.
pub struct LearningSession {
    state: SessionState,
    total_timeout_ms: u32,
    idle_timeout_ms: u32,
    carrier_khz: u8,
}

impl LearningSession {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: SessionState::Idle,
            total_timeout_ms: config.learn_total_timeout_ms,
            idle_timeout_ms: config.burst_idle_timeout_ms,
            carrier_khz: config.default_carrier_khz,
        }
    }

    /// Whether the session is armed or capturing.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, SessionState::Idle)
    }

    /// Name the in-progress attempt will store under, if any.
    pub fn target_name(&self) -> Option<&str> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Armed { name, .. } | SessionState::Capturing { name, .. } => {
                Some(name.as_str())
            }
        }
    }

    /// Begin a learning attempt. Rejected while one is already running.
    pub fn arm(&mut self, name: &str, now_ms: u64) -> Result<(), LearnError> {
        if self.is_active() {
            return Err(LearnError::SessionBusy);
        }
        let name = CommandName::try_from(name).map_err(|()| LearnError::NameTooLong)?;
        info!("learn: armed for '{}'", name);
        self.state = SessionState::Armed {
            name,
            deadline_ms: now_ms + u64::from(self.total_timeout_ms),
        };
        Ok(())
    }

    /// Feed one decoded signal into the session.
    pub fn on_signal(&mut self, signal: &DecodedSignal, now_ms: u64) -> SignalEvent {
        match &mut self.state {
            SessionState::Idle => SignalEvent::Ignored,

            SessionState::Armed { name, .. } => {
                debug!("learn: first signal captured, watching for bursts");
                let name = name.clone();
                // The total deadline restarts at the first captured signal,
                // not at the arm instant.
                self.state = SessionState::Capturing {
                    name,
                    base: signal.clone(),
                    first_ms: now_ms,
                    last_ms: now_ms,
                    bursts: 0,
                    deadline_ms: now_ms + u64::from(self.total_timeout_ms),
                };
                SignalEvent::FirstCapture
            }

            SessionState::Capturing {
                base,
                last_ms,
                bursts,
                deadline_ms,
                ..
            } => {
                if !signals_match(base, signal) {
                    debug!("learn: different signal, ignoring");
                    return SignalEvent::Ignored;
                }
                let since_last = now_ms.saturating_sub(*last_ms);
                if since_last > u64::from(self.idle_timeout_ms) || now_ms > *deadline_ms {
                    // Too late to count; the next tick() ends the capture.
                    return SignalEvent::Ignored;
                }
                *bursts = bursts.saturating_add(1);
                *last_ms = now_ms;
                SignalEvent::BurstDetected {
                    total: u16::from(*bursts) + 1,
                    interval_ms: since_last as u16,
                }
            }
        }
    }

    /// Advance timeouts. Call once per control tick.
    ///
    /// Returns a [`SessionOutcome`] when the attempt ends; the session is
    /// then back in Idle with all fields cleared.
    pub fn tick(&mut self, now_ms: u64) -> Option<SessionOutcome> {
        match &self.state {
            SessionState::Idle => None,

            SessionState::Armed { name, deadline_ms } => {
                if now_ms <= *deadline_ms {
                    return None;
                }
                info!("learn: timeout, no signal received");
                let name = name.clone();
                self.state = SessionState::Idle;
                Some(SessionOutcome::NoSignal { name })
            }

            SessionState::Capturing {
                name,
                base,
                first_ms,
                last_ms,
                bursts,
                deadline_ms,
            } => {
                let idle_timeout = now_ms.saturating_sub(*last_ms) > u64::from(self.idle_timeout_ms);
                let max_timeout = now_ms > *deadline_ms;
                if !idle_timeout && !max_timeout {
                    return None;
                }

                let bursts = *bursts;
                let avg_interval_ms = if bursts > 0 {
                    ((*last_ms - *first_ms) / u64::from(bursts)) as u16
                } else {
                    0
                };

                let kind = match base.protocol {
                    Some(proto) => CommandKind::Protocol {
                        proto: ProtoName::try_from(proto.name()).unwrap_or_default(),
                        addr: base.address,
                        cmd: base.command,
                        // Bursts are modelled via repeat_count, never via the
                        // protocol-native repeat field.
                        rpt: 0,
                    },
                    None => CommandKind::Raw {
                        carrier_khz: self.carrier_khz,
                        timings: base.raw.clone(),
                    },
                };

                let total_bursts = u16::from(bursts) + 1;
                info!(
                    "learn: '{}' complete, {} burst(s), avg interval {} ms ({})",
                    name,
                    total_bursts,
                    avg_interval_ms,
                    if idle_timeout { "idle" } else { "deadline" },
                );

                let outcome = SessionOutcome::Learned {
                    name: name.clone(),
                    payload: CommandPayload {
                        kind,
                        repeat_count: bursts,
                        repeat_interval_ms: avg_interval_ms,
                    },
                    total_bursts,
                };
                self.state = SessionState::Idle;
                Some(outcome)
            }
        }
    }
}
