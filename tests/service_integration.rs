//! Integration tests: broker traffic → IrService → IR hardware, end to end
//! through the port boundary with mock adapters.

#![cfg(not(target_os = "espidf"))]

use irbridge::app::events::Notification;
use irbridge::app::ports::{PublishPort, ReceiverPort, TransmitPort};
use irbridge::app::service::IrService;
use irbridge::config::SystemConfig;
use irbridge::router::Topics;
use irbridge::signal::{DecodedSignal, Protocol};

// ── Mock implementations ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum IrCall {
    Protocol {
        proto: Protocol,
        addr: u16,
        cmd: u16,
        rpt: u8,
    },
    Raw {
        carrier_khz: u8,
        samples: usize,
    },
}

#[derive(Default)]
struct MockIr {
    receiving: bool,
    pending: Vec<DecodedSignal>,
    calls: Vec<IrCall>,
    /// Timestamps passed alongside calls, recorded by the harness.
    call_times: Vec<u64>,
    now_ms: u64,
}

impl ReceiverPort for MockIr {
    fn begin(&mut self) {
        self.receiving = true;
    }
    fn end(&mut self) {
        self.receiving = false;
        self.pending.clear();
    }
    fn decode(&mut self) -> Option<DecodedSignal> {
        if self.receiving && !self.pending.is_empty() {
            Some(self.pending.remove(0))
        } else {
            None
        }
    }
}

impl TransmitPort for MockIr {
    fn send_protocol(&mut self, proto: Protocol, addr: u16, cmd: u16, rpt: u8) {
        self.calls.push(IrCall::Protocol {
            proto,
            addr,
            cmd,
            rpt,
        });
        self.call_times.push(self.now_ms);
    }
    fn send_raw(&mut self, carrier_khz: u8, timings: &[u16]) {
        self.calls.push(IrCall::Raw {
            carrier_khz,
            samples: timings.len(),
        });
        self.call_times.push(self.now_ms);
    }
}

#[derive(Default)]
struct MockBroker {
    notes: Vec<String>,
    definitions: Vec<(String, String)>,
    learn_logs: Vec<String>,
}

impl PublishPort for MockBroker {
    fn notify(&mut self, note: &Notification) {
        self.notes.push(note.to_string());
    }
    fn learn_log(&mut self, json: &str) {
        self.learn_logs.push(json.to_owned());
    }
    fn store_definition(&mut self, name: &str, json: &str) {
        self.definitions.push((name.to_owned(), json.to_owned()));
    }
}

// ── Harness ───────────────────────────────────────────────────

struct Harness {
    topics: Topics,
    service: IrService,
    ir: MockIr,
    broker: MockBroker,
}

impl Harness {
    fn new() -> Self {
        Self {
            topics: Topics::new("home/ir/1"),
            service: IrService::new(&SystemConfig::default()),
            ir: MockIr::default(),
            broker: MockBroker::default(),
        }
    }

    /// Deliver one broker publish the way the MQTT adapter would.
    fn publish(&mut self, topic: &str, payload: &str) {
        let msg = self
            .topics
            .route(topic, payload.as_bytes())
            .unwrap_or_else(|| panic!("unroutable topic {}", topic));
        assert!(self.service.enqueue(msg));
    }

    fn tick(&mut self, now_ms: u64) {
        self.ir.now_ms = now_ms;
        self.service.poll(now_ms, &mut self.ir, &mut self.broker);
    }

    fn receive(&mut self, signal: DecodedSignal) {
        self.ir.pending.push(signal);
    }
}

fn samsung(addr: u16, cmd: u16) -> DecodedSignal {
    DecodedSignal {
        protocol: Some(Protocol::Samsung),
        address: addr,
        command: cmd,
        raw: heapless::Vec::new(),
    }
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn learn_two_burst_samsung_command_end_to_end() {
    let mut h = Harness::new();

    h.publish("home/ir/1/listen", r#"{"name":"tv_vol_up"}"#);
    h.tick(0);
    assert_eq!(h.broker.notes, ["learn_start:tv_vol_up"]);
    assert!(h.ir.receiving);

    h.receive(samsung(7, 7));
    h.tick(0);
    h.receive(samsung(7, 7));
    h.tick(110);
    assert_eq!(
        h.broker.notes,
        ["learn_start:tv_vol_up", "learn_burst_detected:2"]
    );

    // Idle window passes, session closes and publishes.
    h.tick(611);
    assert!(!h.ir.receiving);
    assert_eq!(
        h.broker.notes,
        [
            "learn_start:tv_vol_up",
            "learn_burst_detected:2",
            "learn_success:tv_vol_up,bursts:2"
        ]
    );
    assert_eq!(h.broker.definitions.len(), 1);
    assert_eq!(h.broker.definitions[0].0, "tv_vol_up");
    assert_eq!(
        h.broker.definitions[0].1,
        r#"{"proto":"Samsung","addr":7,"cmd":7,"rpt":0,"repeatCount":1,"repeatInterval":110}"#
    );
    assert_eq!(
        h.broker.learn_logs,
        [r#"{"name":"tv_vol_up","proto":"Samsung","addr":7,"cmd":7}"#]
    );
}

#[test]
fn learned_command_replays_with_burst_spacing() {
    let mut h = Harness::new();

    h.publish("home/ir/1/listen", r#"{"name":"tv_vol_up"}"#);
    h.tick(0);
    h.receive(samsung(7, 7));
    h.tick(0);
    h.receive(samsung(7, 7));
    h.tick(110);
    h.tick(611);
    h.broker.notes.clear();

    // Replay: two bursts, 110 ms apart, polled every 10 ms like the loop.
    h.publish("home/ir/1/send", "tv_vol_up");
    let mut t = 620;
    while h.service.is_transmitting() || h.ir.calls.is_empty() {
        h.tick(t);
        t += 10;
        assert!(t < 2_000, "replay never completed");
    }
    let burst = IrCall::Protocol {
        proto: Protocol::Samsung,
        addr: 7,
        cmd: 7,
        rpt: 0,
    };
    assert_eq!(h.ir.calls, vec![burst.clone(), burst]);
    assert!(h.ir.call_times[1] - h.ir.call_times[0] >= 110);
    assert_eq!(h.broker.notes, ["OK:tv_vol_up"]);
}

#[test]
fn messages_queued_during_replay_run_in_arrival_order() {
    let mut h = Harness::new();
    h.publish(
        "home/ir/1/commands/slow",
        r#"{"proto":"NEC","addr":1,"cmd":1,"repeatCount":3,"repeatInterval":200}"#,
    );
    h.publish(
        "home/ir/1/commands/fast",
        r#"{"proto":"NEC","addr":2,"cmd":2}"#,
    );
    h.tick(0);

    h.publish("home/ir/1/send", "slow");
    h.tick(10);
    assert!(h.service.is_transmitting());

    // These arrive mid-replay and must wait, then run in order.
    h.publish("home/ir/1/send", "fast");
    h.publish("home/ir/1/send", "missing");
    h.publish("home/ir/1/commands/slow", "");

    let mut t = 20;
    while h.service.is_transmitting() {
        h.tick(t);
        t += 10;
        assert!(t < 3_000, "replay never completed");
    }
    h.tick(t);

    assert_eq!(
        h.broker.notes,
        [
            "cached:slow",
            "cached:fast",
            "OK:slow",
            "OK:fast",
            "ERR:NOT_FOUND:missing",
            "deleted:slow"
        ]
    );
    // 4 bursts of "slow" plus 1 of "fast".
    assert_eq!(h.ir.calls.len(), 5);
}

#[test]
fn raw_definition_roundtrip_via_broker_echo() {
    let mut h = Harness::new();
    h.publish(
        "home/ir/1/commands/fan",
        r#"{"raw":true,"freq":56,"data":[9000,4500,560,560,560]}"#,
    );
    h.tick(0);
    assert_eq!(h.broker.notes, ["cached:fan"]);

    h.publish("home/ir/1/send", "fan");
    h.tick(10);
    assert_eq!(
        h.ir.calls,
        [IrCall::Raw {
            carrier_khz: 56,
            samples: 5
        }]
    );
    assert_eq!(h.broker.notes, ["cached:fan", "OK:fan"]);
}

#[test]
fn learn_timeout_without_any_signal() {
    let mut h = Harness::new();
    h.publish("home/ir/1/listen", r#"{"name":"tv"}"#);
    h.tick(1_000);
    h.tick(10_500); // still within the 10 s deadline from arming at t=1000
    assert_eq!(h.broker.notes, ["learn_start:tv"]);
    h.tick(11_001);
    assert_eq!(h.broker.notes, ["learn_start:tv", "learn_timeout:no_signal"]);
    assert!(!h.ir.receiving);
}

#[test]
fn arm_while_learning_is_ignored_without_output() {
    let mut h = Harness::new();
    h.publish("home/ir/1/listen", r#"{"name":"first"}"#);
    h.tick(0);
    h.publish("home/ir/1/listen", r#"{"name":"second"}"#);
    h.tick(10);
    assert_eq!(h.broker.notes, ["learn_start:first"]);

    // The original session is unaffected and still times out by itself.
    h.tick(10_011);
    assert_eq!(
        h.broker.notes,
        ["learn_start:first", "learn_timeout:no_signal"]
    );
}

#[test]
fn cache_capacity_is_enforced_through_the_channel() {
    let mut h = Harness::new();
    // One per tick: the inbound queue is intentionally shallow.
    for i in 0..30 {
        h.publish(
            &format!("home/ir/1/commands/cmd{}", i),
            r#"{"proto":"NEC","addr":1,"cmd":1}"#,
        );
        h.tick(0);
    }
    assert_eq!(h.service.store().len(), 30);
    assert_eq!(h.broker.notes.len(), 30);
    h.broker.notes.clear();

    h.publish(
        "home/ir/1/commands/one_too_many",
        r#"{"proto":"NEC","addr":1,"cmd":1}"#,
    );
    // Overwriting an existing name must still work at capacity.
    h.publish(
        "home/ir/1/commands/cmd7",
        r#"{"proto":"NEC","addr":9,"cmd":9}"#,
    );
    h.tick(10);
    assert_eq!(h.broker.notes, ["ERR:CACHE_FULL", "cached:cmd7"]);
    assert_eq!(h.service.store().len(), 30);
}

#[test]
fn malformed_listen_payloads_each_get_their_error() {
    let mut h = Harness::new();
    h.publish("home/ir/1/listen", "{nope");
    h.publish("home/ir/1/listen", r#"{"label":"tv"}"#);
    h.publish(
        "home/ir/1/listen",
        &format!(r#"{{"name":"{}"}}"#, "x".repeat(32)),
    );
    h.tick(0);
    assert_eq!(
        h.broker.notes,
        ["ERR:INVALID_JSON", "ERR:NO_NAME", "ERR:NAME_TOO_LONG"]
    );
    assert!(!h.service.is_learning());
}

#[test]
fn deleted_command_is_no_longer_sendable() {
    let mut h = Harness::new();
    h.publish("home/ir/1/commands/tv", r#"{"proto":"NEC","addr":1,"cmd":2}"#);
    h.publish("home/ir/1/commands/tv", "");
    h.publish("home/ir/1/send", "tv");
    h.tick(0);
    assert_eq!(
        h.broker.notes,
        ["cached:tv", "deleted:tv", "ERR:NOT_FOUND:tv"]
    );
    assert!(h.ir.calls.is_empty());
}

#[test]
fn signals_before_arming_are_discarded() {
    let mut h = Harness::new();
    // Receiver off: nothing pending is ever read.
    h.receive(samsung(1, 1));
    h.tick(0);
    assert!(h.broker.notes.is_empty());
    assert!(!h.service.is_learning());
}
