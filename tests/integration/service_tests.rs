//! Integration tests for the FridgeService control loop.
//!
//! Sensors are mocks; connectivity runs either on mocks or on the host
//! simulation of the real WiFi and MQTT adapters.

use fridgewatch::adapters::mqtt::{MqttAdapter, SimBroker};
use fridgewatch::adapters::wifi::WifiAdapter;
use fridgewatch::analysis::Phase;
use fridgewatch::app::commands::FridgeCommand;
use fridgewatch::app::events::FridgeEvent;
use fridgewatch::app::service::FridgeService;
use fridgewatch::config::{SystemConfig, WifiCredential};
use fridgewatch::sensors::door::DoorState;

use crate::mock_hw::{
    CountingHousekeeping, MockLight, MockLoadCell, MockNetwork, MockSession, NoopDelay,
    RecordingSink, test_config,
};

const DOOR: &str = "devlol/h19/fridge/door";
const RAW: &str = "devlol/h19/fridge/rawsamples";
const ONLINE: &str = "devlol/h19/fridge/online";
const RESET: &str = "devlol/h19/fridge/reset";
const BOTTLES: &str = "devlol/h19/fridge/bottles/out";

/// Raw reading that scales to exactly 2.000 with the default calibration.
const TWO_UNITS: i32 = 8_458_217 + 2 * 11_600;
/// One 0.88 kg bottle less than [`TWO_UNITS`].
const ONE_BOTTLE_LESS: i32 = 8_458_217 + 12_992;

type MockService = FridgeService<MockLight, NoopDelay, MockLoadCell, MockNetwork, MockSession>;

fn make_service(online: bool) -> (MockService, RecordingSink, CountingHousekeeping) {
    let cfg = test_config();
    let network = if online {
        MockNetwork::reaching(&["primary"])
    } else {
        MockNetwork::reaching(&[])
    };
    let mut service = FridgeService::from_config(
        &cfg,
        MockLight::steady(0),
        NoopDelay::default(),
        MockLoadCell::new(TWO_UNITS),
        network,
        MockSession::new(),
    );
    let mut sink = RecordingSink::new();
    service.start(&mut sink);
    (service, sink, CountingHousekeeping::default())
}

// ── Startup / telemetry ───────────────────────────────────────

#[test]
fn start_reports_closed_door() {
    let (service, sink, _) = make_service(true);
    assert_eq!(sink.events, vec![FridgeEvent::Started(DoorState::Closed)]);
    assert_eq!(service.door_state(), DoorState::Closed);
}

#[test]
fn telemetry_is_three_decimals_and_retained() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.tick(&mut sink, &mut hk);

    let publishes = service.connectivity_mut().session_mut().publishes();
    let raw: Vec<_> = publishes.iter().filter(|(t, _, _)| t == RAW).collect();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].1, b"2.000".to_vec());
    assert!(raw[0].2, "rawsamples must be retained");

    assert_eq!(service.last_weight(), Some(2.0));
    assert!(sink.events.contains(&FridgeEvent::Telemetry { weight: 2.0 }));
}

#[test]
fn one_telemetry_message_per_connected_tick() {
    let (mut service, mut sink, mut hk) = make_service(true);
    for _ in 0..5 {
        service.tick(&mut sink, &mut hk);
    }
    let publishes = service.connectivity_mut().session_mut().publishes();
    assert_eq!(publishes.iter().filter(|(t, _, _)| t == RAW).count(), 5);
    assert_eq!(service.tick_count(), 5);
}

#[test]
fn inverted_calibration_reports_plain_zero() {
    let mut cfg = test_config();
    cfg.calibration_factor = -11_600.0;
    assert!(cfg.validate().is_ok());
    let mut service = FridgeService::from_config(
        &cfg,
        MockLight::steady(0),
        NoopDelay::default(),
        MockLoadCell::new(cfg.initial_offset),
        MockNetwork::reaching(&["primary"]),
        MockSession::new(),
    );
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());
    service.tick(&mut sink, &mut hk);

    let raw: Vec<_> = service
        .connectivity_mut()
        .session_mut()
        .publishes()
        .into_iter()
        .filter(|(t, _, _)| t == RAW)
        .map(|(_, p, _)| p)
        .collect();
    assert_eq!(raw, vec![b"0.000".to_vec()]);
}

#[test]
fn no_telemetry_while_offline() {
    let (mut service, mut sink, mut hk) = make_service(false);
    service.tick(&mut sink, &mut hk);

    assert!(service.connectivity_mut().session_mut().publishes().is_empty());
    assert_eq!(service.weight_mut().cell_mut().reads, 0, "load cell untouched offline");
    assert_eq!(service.last_weight(), None);
}

// ── Door ──────────────────────────────────────────────────────

#[test]
fn door_open_published_once_not_retained() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.door_mut().light_mut().steady = 200;

    service.tick(&mut sink, &mut hk);
    service.tick(&mut sink, &mut hk);

    let publishes = service.connectivity_mut().session_mut().publishes();
    let door: Vec<_> = publishes.iter().filter(|(t, _, _)| t == DOOR).collect();
    assert_eq!(door.len(), 1, "steady state must not republish");
    assert_eq!(door[0].1, b"OPEN".to_vec());
    assert!(!door[0].2, "door must not be retained");
    assert_eq!(service.door_state(), DoorState::Open);
}

#[test]
fn door_close_after_open() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.door_mut().light_mut().steady = 200;
    service.tick(&mut sink, &mut hk);
    service.door_mut().light_mut().steady = 10;
    service.tick(&mut sink, &mut hk);

    let door: Vec<_> = service
        .connectivity_mut()
        .session_mut()
        .publishes()
        .into_iter()
        .filter(|(t, _, _)| t == DOOR)
        .map(|(_, p, _)| p)
        .collect();
    assert_eq!(door, vec![b"OPEN".to_vec(), b"CLOSE".to_vec()]);
}

#[test]
fn flicker_inside_window_is_ignored() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.door_mut().light_mut().push(&[200, 200, 200, 10]);
    service.tick(&mut sink, &mut hk);

    assert_eq!(service.door_state(), DoorState::Closed);
    assert_eq!(sink.count(|e| matches!(e, FridgeEvent::DoorChanged(_))), 0);
}

#[test]
fn debounce_window_takes_eleven_samples_and_100ms() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.tick(&mut sink, &mut hk);
    assert_eq!(service.door_mut().light_mut().reads, 11);
    assert_eq!(service.door_mut().delay_mut().total_ns, 100_000_000);
}

#[test]
fn offline_door_change_still_updates_state() {
    let (mut service, mut sink, mut hk) = make_service(false);
    service.door_mut().light_mut().steady = 200;
    service.tick(&mut sink, &mut hk);

    assert_eq!(service.door_state(), DoorState::Open);
    assert!(sink.events.contains(&FridgeEvent::DoorChanged(DoorState::Open)));
    assert!(sink.events.contains(&FridgeEvent::PublishFailed { topic: DOOR.into() }));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn reset_zeroes_the_scale() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.tick(&mut sink, &mut hk);
    service.connectivity_mut().session_mut().deliver(RESET, b"");
    service.tick(&mut sink, &mut hk);

    assert_eq!(service.calibration_offset(), TWO_UNITS);
    assert!(sink.events.contains(&FridgeEvent::Calibrated { offset: TWO_UNITS }));

    service.tick(&mut sink, &mut hk);
    let last_raw = service
        .connectivity_mut()
        .session_mut()
        .publishes()
        .into_iter()
        .filter(|(t, _, _)| t == RAW)
        .last()
        .map(|(_, p, _)| p);
    assert_eq!(last_raw, Some(b"0.000".to_vec()));
}

#[test]
fn reset_payload_is_not_inspected() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.tick(&mut sink, &mut hk);
    service.connectivity_mut().session_mut().deliver(RESET, b"anything at all");
    service.tick(&mut sink, &mut hk);
    assert_eq!(sink.count(|e| matches!(e, FridgeEvent::Calibrated { .. })), 1);
}

#[test]
fn own_publications_and_foreign_topics_are_ignored() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.tick(&mut sink, &mut hk);
    {
        let session = service.connectivity_mut().session_mut();
        session.deliver(RAW, b"2.000");
        session.deliver(DOOR, b"OPEN");
        session.deliver(ONLINE, b"true");
        session.deliver("devlol/h19/fridge/reset/extra", b"");
        session.deliver("devlol/h19/other/reset", b"");
    }
    service.tick(&mut sink, &mut hk);

    assert_eq!(sink.count(|e| matches!(e, FridgeEvent::Calibrated { .. })), 0);
    assert_eq!(service.calibration_offset(), 8_458_217);
}

#[test]
fn direct_command_calibrates() {
    let (mut service, mut sink, _) = make_service(false);
    service.handle_command(FridgeCommand::ZeroCalibration, &mut sink);
    assert_eq!(service.calibration_offset(), TWO_UNITS);
    assert_eq!(service.weight_mut().cell_mut().reads, 10, "calibration averages 10 samples");
}

// ── Bottle analysis ───────────────────────────────────────────

#[test]
fn bottle_taken_during_door_cycle_is_published() {
    let (mut service, mut sink, mut hk) = make_service(true);

    // The analysis needs a confirmed close before it trusts the weight.
    service.door_mut().light_mut().steady = 200;
    service.tick(&mut sink, &mut hk);
    service.door_mut().light_mut().steady = 0;
    for _ in 0..10 {
        service.tick(&mut sink, &mut hk);
    }
    assert_eq!(service.analysis().phase(), Phase::ClosedStable);

    service.weight_mut().cell_mut().raw = ONE_BOTTLE_LESS;
    service.door_mut().light_mut().steady = 200;
    service.tick(&mut sink, &mut hk);
    service.door_mut().light_mut().steady = 0;
    for _ in 0..12 {
        service.tick(&mut sink, &mut hk);
    }

    assert_eq!(service.analysis().phase(), Phase::ClosedStable);
    assert_eq!(sink.count(|e| matches!(e, FridgeEvent::BottlesTaken { .. })), 1);
    assert!(sink.events.contains(&FridgeEvent::BottlesTaken { count: 1 }));
    let bottles: Vec<_> = service
        .connectivity_mut()
        .session_mut()
        .publishes()
        .into_iter()
        .filter(|(t, _, _)| t == BOTTLES)
        .collect();
    assert_eq!(bottles, vec![(BOTTLES.to_owned(), b"1".to_vec(), false)]);
}

#[test]
fn weight_change_with_door_shut_counts_nothing() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.door_mut().light_mut().steady = 200;
    service.tick(&mut sink, &mut hk);
    service.door_mut().light_mut().steady = 0;
    for _ in 0..10 {
        service.tick(&mut sink, &mut hk);
    }

    service.weight_mut().cell_mut().raw = ONE_BOTTLE_LESS;
    for _ in 0..12 {
        service.tick(&mut sink, &mut hk);
    }
    assert_eq!(sink.count(|e| matches!(e, FridgeEvent::BottlesTaken { .. })), 0);
}

// ── Housekeeping ──────────────────────────────────────────────

#[test]
fn housekeeping_runs_every_tick_online_or_not() {
    for online in [true, false] {
        let (mut service, mut sink, mut hk) = make_service(online);
        for _ in 0..3 {
            service.tick(&mut sink, &mut hk);
        }
        assert_eq!(hk.serviced, 3);
    }
}

// ── Connectivity events ───────────────────────────────────────

#[test]
fn connectivity_transitions_are_reported() {
    let (mut service, mut sink, mut hk) = make_service(true);
    service.tick(&mut sink, &mut hk);
    assert_eq!(sink.count(|e| *e == FridgeEvent::NetworkUp), 1);
    assert_eq!(sink.count(|e| *e == FridgeEvent::SessionUp), 1);

    sink.clear();
    service.connectivity_mut().network_mut().associated = false;
    service.connectivity_mut().network_mut().reachable.clear();
    service.tick(&mut sink, &mut hk);

    let transitions: Vec<_> = sink
        .events
        .iter()
        .filter(|e| matches!(e, FridgeEvent::SessionDown | FridgeEvent::NetworkDown))
        .cloned()
        .collect();
    assert_eq!(transitions, vec![FridgeEvent::SessionDown, FridgeEvent::NetworkDown]);
    assert!(!service.connection_state().session_up());
}

// ── End to end over the simulated broker ──────────────────────

type SimService = FridgeService<MockLight, NoopDelay, MockLoadCell, WifiAdapter, MqttAdapter>;

fn make_sim_service(broker: &SimBroker) -> SimService {
    let cfg = test_config();
    let mut wifi = WifiAdapter::new();
    wifi.sim_add_network(WifiCredential::new("primary", "password123").unwrap());
    FridgeService::from_config(
        &cfg,
        MockLight::steady(0),
        NoopDelay::default(),
        MockLoadCell::new(TWO_UNITS),
        wifi,
        MqttAdapter::new(broker.clone()),
    )
}

#[test]
fn sim_broker_sees_liveness_and_telemetry() {
    let broker = SimBroker::new();
    let mut service = make_sim_service(&broker);
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());

    service.tick(&mut sink, &mut hk);

    assert_eq!(broker.retained(ONLINE).as_deref(), Some(&b"true"[..]));
    assert_eq!(broker.retained(RAW).as_deref(), Some(&b"2.000"[..]));
    assert_eq!(broker.subscriptions("fridge"), vec!["devlol/h19/fridge/#".to_owned()]);
}

#[test]
fn reset_is_handled_after_session_drop_and_reconnect() {
    let broker = SimBroker::new();
    let mut service = make_sim_service(&broker);
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());

    service.tick(&mut sink, &mut hk);
    broker.drop_client("fridge");
    assert_eq!(broker.retained(ONLINE).as_deref(), Some(&b"false"[..]), "last will");

    service.tick(&mut sink, &mut hk);
    assert_eq!(broker.retained(ONLINE).as_deref(), Some(&b"true"[..]));
    assert_eq!(service.connectivity_mut().sessions_established(), 2);

    broker.publish(RESET, b"", false);
    service.tick(&mut sink, &mut hk);

    assert_eq!(service.calibration_offset(), TWO_UNITS);
    assert_eq!(sink.count(|e| matches!(e, FridgeEvent::Calibrated { .. })), 1);
}

#[test]
fn link_drop_between_ticks_gives_a_fresh_session() {
    let broker = SimBroker::new();
    let mut service = make_sim_service(&broker);
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());

    service.tick(&mut sink, &mut hk);
    sink.clear();
    service.connectivity_mut().network_mut().sim_drop_link();
    service.tick(&mut sink, &mut hk);

    assert_eq!(service.connectivity_mut().sessions_established(), 2);
    assert_eq!(broker.session_count(), 1);
    assert_eq!(broker.subscriptions("fridge"), vec!["devlol/h19/fridge/#".to_owned()]);
    assert_eq!(broker.retained(ONLINE).as_deref(), Some(&b"true"[..]));

    let transitions: Vec<_> = sink
        .events
        .iter()
        .filter(|e| {
            matches!(
                e,
                FridgeEvent::SessionDown
                    | FridgeEvent::NetworkDown
                    | FridgeEvent::NetworkUp
                    | FridgeEvent::SessionUp
            )
        })
        .cloned()
        .collect();
    assert_eq!(
        transitions,
        vec![
            FridgeEvent::SessionDown,
            FridgeEvent::NetworkDown,
            FridgeEvent::NetworkUp,
            FridgeEvent::SessionUp,
        ]
    );

    broker.publish(RESET, b"", false);
    service.tick(&mut sink, &mut hk);
    assert_eq!(service.calibration_offset(), TWO_UNITS);
}

#[test]
fn failing_subscribe_leaves_broker_showing_offline() {
    let broker = SimBroker::new();
    broker.set_fail_subscribe(true);
    let mut service = make_sim_service(&broker);
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());

    for _ in 0..5 {
        service.tick(&mut sink, &mut hk);
    }

    assert!(!service.connection_state().session_up());
    assert_eq!(broker.session_count(), 0);
    assert_ne!(broker.retained(ONLINE).as_deref(), Some(&b"true"[..]));
    assert!(
        broker.published_on(ONLINE).iter().all(|m| m.payload == b"false"),
        "online=true must never be announced without the subscription"
    );

    broker.set_fail_subscribe(false);
    service.tick(&mut sink, &mut hk);
    assert!(service.connection_state().session_up());
    assert_eq!(broker.retained(ONLINE).as_deref(), Some(&b"true"[..]));
}

#[test]
fn unreachable_broker_keeps_retrying() {
    let broker = SimBroker::new();
    broker.set_reachable(false);
    let mut service = make_sim_service(&broker);
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());

    service.tick(&mut sink, &mut hk);
    assert!(service.connection_state().network_up());
    assert!(!service.connection_state().session_up());

    broker.set_reachable(true);
    service.tick(&mut sink, &mut hk);
    assert!(service.connection_state().session_up());
    assert_eq!(hk.serviced, 2);
}

#[test]
fn custom_prefix_is_used_everywhere() {
    let cfg = SystemConfig::from_json(
        r#"{"topic_prefix":"lab/fridge2/","wifi_networks":[{"ssid":"primary","password":"password123"}]}"#,
    )
    .unwrap();
    let broker = SimBroker::new();
    let mut wifi = WifiAdapter::new();
    wifi.sim_add_network(WifiCredential::new("primary", "password123").unwrap());
    let mut service = FridgeService::from_config(
        &cfg,
        MockLight::steady(0),
        NoopDelay::default(),
        MockLoadCell::new(TWO_UNITS),
        wifi,
        MqttAdapter::new(broker.clone()),
    );
    let (mut sink, mut hk) = (RecordingSink::new(), CountingHousekeeping::default());
    service.tick(&mut sink, &mut hk);

    assert_eq!(broker.retained("lab/fridge2/online").as_deref(), Some(&b"true"[..]));
    assert_eq!(broker.subscriptions("fridge"), vec!["lab/fridge2/#".to_owned()]);

    broker.publish("lab/fridge2/reset", b"", false);
    service.tick(&mut sink, &mut hk);
    assert_eq!(service.calibration_offset(), TWO_UNITS);
}
