//! Deferred burst transmission.
//!
//! Replaying a command produces `1 + repeat_count` bursts spaced by
//! `repeat_interval_ms`. Instead of sleeping between bursts, a [`BurstJob`]
//! carries a `next_due_ms` and is advanced from the control loop, so
//! message and receiver polling keep running while a long burst train goes
//! out. The first burst is sent the moment the job starts.

use log::{debug, info};

use crate::command::{CommandKind, StoredCommand};
use crate::signal::Protocol;

use crate::app::ports::TransmitPort;

/// One in-flight replay of a stored command.
pub struct BurstJob {
    command: StoredCommand,
    /// Bursts already sent (at least 1 once the job exists).
    sent: u16,
    next_due_ms: u64,
}

impl BurstJob {
    /// Start replaying `command`: sends the first burst immediately and
    /// schedules the rest.
    pub fn start(command: StoredCommand, now_ms: u64, tx: &mut impl TransmitPort) -> Self {
        let total = command.total_bursts();
        if total > 1 {
            info!(
                "transmit: '{}' x{} bursts, {} ms apart",
                command.name, total, command.payload.repeat_interval_ms
            );
        }
        send_burst(&command, tx);
        Self {
            sent: 1,
            next_due_ms: now_ms + u64::from(command.payload.repeat_interval_ms),
            command,
        }
    }

    /// Name of the command being replayed.
    pub fn name(&self) -> &str {
        self.command.name.as_str()
    }

    /// Send any bursts that have come due. Returns `true` when the full
    /// sequence has gone out.
    pub fn poll(&mut self, now_ms: u64, tx: &mut impl TransmitPort) -> bool {
        let total = self.command.total_bursts();
        while self.sent < total && now_ms >= self.next_due_ms {
            debug!("transmit: burst #{}", self.sent);
            send_burst(&self.command, tx);
            self.sent += 1;
            self.next_due_ms += u64::from(self.command.payload.repeat_interval_ms);
        }
        self.sent >= total
    }
}

fn send_burst(command: &StoredCommand, tx: &mut impl TransmitPort) {
    match &command.payload.kind {
        CommandKind::Protocol {
            proto,
            addr,
            cmd,
            rpt,
        } => {
            tx.send_protocol(Protocol::from_name(proto.as_str()), *addr, *cmd, *rpt);
        }
        CommandKind::Raw {
            carrier_khz,
            timings,
        } => {
            tx.send_raw(*carrier_khz, timings.as_slice());
        }
    }
}
