//! Control-loop service tying the cache, learner, and transmitter together.
//!
//! [`IrService`] is the single-threaded heart of the bridge. The main loop
//! feeds it classified inbound messages and calls [`IrService::poll`] on a
//! fixed cadence with the current monotonic time; the service never sleeps
//! and never blocks, so a multi-burst replay is sequenced across polls by
//! [`BurstJob`] instead of stalling the loop.
//!
//! Ordering guarantee: messages are handled strictly in arrival order, and
//! none are handled while a replay job is in flight. Arrivals during a job
//! wait in a small FIFO.

use log::{debug, warn};
use serde::Deserialize;

use crate::app::commands::InboundMessage;
use crate::app::events::Notification;
use crate::app::ports::{PublishPort, ReceiverPort, TransmitPort};
use crate::codec;
use crate::command::MAX_NAME_BYTES;
use crate::config::SystemConfig;
use crate::error::StoreError;
use crate::learn::{LearningSession, SessionOutcome, SignalEvent};
use crate::store::CommandStore;
use crate::transmit::BurstJob;

/// Messages buffered while a replay job holds the loop.
const INBOUND_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
struct ListenRequest {
    name: Option<String>,
}

pub struct IrService {
    store: CommandStore,
    session: LearningSession,
    job: Option<BurstJob>,
    inbound: heapless::Deque<InboundMessage, INBOUND_QUEUE_DEPTH>,
}

impl IrService {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            store: CommandStore::new(),
            session: LearningSession::new(config),
            job: None,
            inbound: heapless::Deque::new(),
        }
    }

    pub fn store(&self) -> &CommandStore {
        &self.store
    }

    /// True while a learning session is armed or capturing. Drives the LED.
    pub fn is_learning(&self) -> bool {
        self.session.is_active()
    }

    pub fn is_transmitting(&self) -> bool {
        self.job.is_some()
    }

    /// Boot announcement, sent once after the retained definitions drained.
    pub fn announce_online(&self, sink: &mut impl PublishPort) {
        sink.notify(&Notification::Online {
            loaded: self.store.len(),
        });
    }

    /// Queue one classified message. Returns false if the queue was full,
    /// in which case the message is dropped.
    pub fn enqueue(&mut self, msg: InboundMessage) -> bool {
        if let Err(msg) = self.inbound.push_back(msg) {
            warn!("inbound queue full, dropping {:?}", msg);
            return false;
        }
        true
    }

    /// One control-loop step at monotonic time `now_ms`.
    pub fn poll<H, P>(&mut self, now_ms: u64, hw: &mut H, sink: &mut P)
    where
        H: ReceiverPort + TransmitPort,
        P: PublishPort,
    {
        // Advance an in-flight replay first; its completion unblocks the queue.
        if let Some(job) = self.job.as_mut() {
            if job.poll(now_ms, hw) {
                sink.notify(&Notification::Sent(job.name().to_owned()));
                self.job = None;
            }
        }

        while self.job.is_none() {
            let Some(msg) = self.inbound.pop_front() else {
                break;
            };
            self.dispatch(msg, now_ms, hw, sink);
        }

        while let Some(signal) = hw.decode() {
            match self.session.on_signal(&signal, now_ms) {
                SignalEvent::Ignored => {}
                SignalEvent::FirstCapture => debug!("base signal captured"),
                SignalEvent::BurstDetected { total, interval_ms } => {
                    debug!("burst {} after {} ms", total, interval_ms);
                    sink.notify(&Notification::LearnBurstDetected(total));
                }
            }
        }

        if let Some(outcome) = self.session.tick(now_ms) {
            hw.end();
            self.finish_learning(outcome, sink);
        }
    }

    fn dispatch<H, P>(&mut self, msg: InboundMessage, now_ms: u64, hw: &mut H, sink: &mut P)
    where
        H: ReceiverPort + TransmitPort,
        P: PublishPort,
    {
        match msg {
            InboundMessage::Send { name } => self.handle_send(name, now_ms, hw, sink),
            InboundMessage::Arm { payload } => self.handle_arm(&payload, now_ms, hw, sink),
            InboundMessage::Definition { name, payload } => {
                self.handle_definition(name, &payload, sink)
            }
        }
    }

    fn handle_send<H, P>(&mut self, name: String, now_ms: u64, hw: &mut H, sink: &mut P)
    where
        H: TransmitPort,
        P: PublishPort,
    {
        if name.is_empty() {
            sink.notify(&Notification::EmptyCommandName);
            return;
        }
        let Some(command) = self.store.lookup(&name) else {
            sink.notify(&Notification::NotFound(name));
            return;
        };
        let mut job = BurstJob::start(command.clone(), now_ms, hw);
        if job.poll(now_ms, hw) {
            // Single-burst commands finish within the same poll.
            sink.notify(&Notification::Sent(name));
        } else {
            self.job = Some(job);
        }
    }

    fn handle_arm<H, P>(&mut self, payload: &str, now_ms: u64, hw: &mut H, sink: &mut P)
    where
        H: ReceiverPort,
        P: PublishPort,
    {
        let Ok(request) = serde_json::from_str::<ListenRequest>(payload) else {
            sink.notify(&Notification::InvalidJson);
            return;
        };
        let name = match request.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                sink.notify(&Notification::NoName);
                return;
            }
        };
        if name.len() > MAX_NAME_BYTES {
            sink.notify(&Notification::NameTooLong);
            return;
        }
        match self.session.arm(&name, now_ms) {
            Ok(()) => {
                hw.begin();
                sink.notify(&Notification::LearnStart(name));
            }
            Err(err) => debug!("learn request for {} rejected: {}", name, err),
        }
    }

    fn handle_definition<P>(&mut self, name: String, payload: &str, sink: &mut P)
    where
        P: PublishPort,
    {
        if payload.is_empty() {
            // Retained-delete: only acknowledge entries that actually existed,
            // so our own cleanup publishes stay silent.
            if self.store.delete(&name) {
                sink.notify(&Notification::Deleted(name));
            }
            return;
        }
        let payload = match codec::decode(payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("definition for {} rejected: {}", name, err);
                sink.notify(&Notification::BadDefinition(name));
                return;
            }
        };
        match self.store.upsert(&name, payload) {
            Ok(_) => sink.notify(&Notification::Cached(name)),
            Err(StoreError::CacheFull) => sink.notify(&Notification::CacheFull),
            Err(StoreError::NameTooLong) => {
                warn!("definition name too long, ignoring: {}", name);
            }
        }
    }

    fn finish_learning<P>(&mut self, outcome: SessionOutcome, sink: &mut P)
    where
        P: PublishPort,
    {
        match outcome {
            SessionOutcome::NoSignal { name } => {
                debug!("learning {} saw no signal", name);
                sink.notify(&Notification::LearnTimeoutNoSignal);
            }
            SessionOutcome::Learned {
                name,
                payload,
                total_bursts,
            } => {
                // Local cache first so an immediate send works even before the
                // broker echoes the retained definition back.
                if let Err(StoreError::CacheFull) = self.store.upsert(&name, payload.clone()) {
                    sink.notify(&Notification::CacheFull);
                }
                match codec::encode(&payload) {
                    Ok(json) => sink.store_definition(&name, &json),
                    Err(err) => warn!("could not serialize {}: {}", name, err),
                }
                match codec::encode_learn_log(&name, &payload) {
                    Ok(json) => sink.learn_log(&json),
                    Err(err) => warn!("could not serialize learn log for {}: {}", name, err),
                }
                sink.notify(&Notification::LearnSuccess {
                    name: name.as_str().to_owned(),
                    total_bursts,
                });
            }
        }
    }
}
