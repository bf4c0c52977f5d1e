//! Application service — the hexagonal core.
//!
//! [`FridgeService`] owns the door detector, the weight sensor adapter and
//! the connectivity manager, and runs one control iteration per
//! [`tick`](FridgeService::tick):
//!
//! ```text
//!  1. ensure WiFi + MQTT          (ConnectivityManager)
//!  2. door debounce window        (DoorDetector)  ──▶ <prefix>door
//!  3. weight reading, if online   (WeightSensor)  ──▶ <prefix>rawsamples
//!     bottle analysis             (BottleAnalyzer) ──▶ <prefix>bottles/out
//!  4. drain inbound commands      (reset ──▶ zero calibration)
//!  5. housekeeping                (watchdog / yield)
//! ```
//!
//! Everything is single-threaded; all state lives in this struct for the
//! lifetime of the control loop.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::analysis::BottleAnalyzer;
use crate::config::SystemConfig;
use crate::connectivity::{ConnectionState, ConnectivityManager};
use crate::sensors::door::{DoorDetector, DoorState};
use crate::sensors::weight::WeightSensor;

use super::commands::FridgeCommand;
use super::events::FridgeEvent;
use super::ports::{
    EventSink, HousekeepingPort, LightSensorPort, LoadCellPort, NetworkPort, SessionPort,
};
use super::topics::Topics;

// ───────────────────────────────────────────────────────────────
// FridgeService
// ───────────────────────────────────────────────────────────────

pub struct FridgeService<L, D, C, N, S> {
    door: DoorDetector<L, D>,
    weight: WeightSensor<C>,
    connectivity: ConnectivityManager<N, S>,
    analysis: BottleAnalyzer,
    topics: Topics,
    calibration_factor: f32,
    calibration_samples: u8,
    loop_interval_ms: u32,
    tick_count: u64,
    last_weight: Option<f32>,
}

impl<L, D, C, N, S> FridgeService<L, D, C, N, S>
where
    L: LightSensorPort,
    D: DelayNs,
    C: LoadCellPort,
    N: NetworkPort,
    S: SessionPort,
{
    pub fn new(
        config: &SystemConfig,
        door: DoorDetector<L, D>,
        weight: WeightSensor<C>,
        connectivity: ConnectivityManager<N, S>,
    ) -> Self {
        Self {
            door,
            weight,
            topics: connectivity.topics().clone(),
            connectivity,
            analysis: BottleAnalyzer::from_config(config),
            calibration_factor: config.calibration_factor,
            calibration_samples: config.calibration_samples,
            loop_interval_ms: config.loop_interval_ms,
            tick_count: 0,
            last_weight: None,
        }
    }

    /// Wire every component straight from configuration.
    pub fn from_config(config: &SystemConfig, light: L, delay: D, cell: C, network: N, session: S) -> Self {
        let topics = Topics::new(&config.topic_prefix);
        let door = DoorDetector::from_config(light, delay, config);
        let weight = WeightSensor::new(cell, config.initial_offset, config.telemetry_samples);
        let connectivity = ConnectivityManager::new(network, session, config, topics);
        Self::new(config, door, weight, connectivity)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&FridgeEvent::Started(self.door.state()));
        info!(
            "FridgeService started (door={:?}, offset={})",
            self.door.state(),
            self.weight.offset()
        );
    }

    /// Run the control loop forever, pacing iterations with `pacer`.
    pub fn run(
        &mut self,
        sink: &mut impl EventSink,
        housekeeping: &mut impl HousekeepingPort,
        pacer: &mut impl DelayNs,
    ) -> ! {
        loop {
            pacer.delay_ms(self.loop_interval_ms);
            self.tick(sink, housekeeping);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One full control iteration.
    pub fn tick(&mut self, sink: &mut impl EventSink, housekeeping: &mut impl HousekeepingPort) {
        self.tick_count += 1;

        // 1. Connectivity
        let before = self.connectivity.state();
        let associations_before = self.connectivity.associations();
        let sessions_before = self.connectivity.sessions_established();
        let now = self.connectivity.ensure_connected();
        let bounce = Bounce {
            rejoined: self.connectivity.associations() != associations_before,
            reconnected: self.connectivity.sessions_established() != sessions_before,
        };
        emit_transitions(before, now, bounce, sink);

        // 2. Door
        if let Some(state) = self.door.evaluate() {
            sink.emit(&FridgeEvent::DoorChanged(state));
            self.analysis.on_door(state);
            publish_or_report(
                &mut self.connectivity,
                &self.topics.door,
                state.payload().as_bytes(),
                false,
                sink,
            );
        }

        // 3. Weight telemetry
        if now.session_up() {
            let weight = self.weight.read_scaled(self.calibration_factor);
            let payload = telemetry_payload(weight);
            if publish_or_report(
                &mut self.connectivity,
                &self.topics.rawsamples,
                payload.as_bytes(),
                true,
                sink,
            ) {
                self.last_weight = Some(weight);
                sink.emit(&FridgeEvent::Telemetry { weight });

                if let Some(count) = self.analysis.on_sample(weight) {
                    sink.emit(&FridgeEvent::BottlesTaken { count });
                    publish_or_report(
                        &mut self.connectivity,
                        &self.topics.bottles_out,
                        count.to_string().as_bytes(),
                        false,
                        sink,
                    );
                }
            }
        }

        // 4. Inbound commands
        let Self {
            connectivity,
            weight,
            topics,
            calibration_samples,
            ..
        } = self;
        connectivity.poll_inbound(|msg| {
            if let Some(cmd) = FridgeCommand::from_message(topics, msg) {
                apply_command(weight, *calibration_samples, cmd, &mut *sink);
            }
        });

        // 5. Housekeeping, every iteration regardless of the above.
        housekeeping.service();
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a command directly (outside of MQTT delivery).
    pub fn handle_command(&mut self, cmd: FridgeCommand, sink: &mut impl EventSink) {
        apply_command(&mut self.weight, self.calibration_samples, cmd, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn door_state(&self) -> DoorState {
        self.door.state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connectivity.state()
    }

    pub fn calibration_offset(&self) -> i32 {
        self.weight.offset()
    }

    /// Last weight successfully published, in calibrated units.
    pub fn last_weight(&self) -> Option<f32> {
        self.last_weight
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn door_mut(&mut self) -> &mut DoorDetector<L, D> {
        &mut self.door
    }

    pub fn weight_mut(&mut self) -> &mut WeightSensor<C> {
        &mut self.weight
    }

    pub fn connectivity_mut(&mut self) -> &mut ConnectivityManager<N, S> {
        &mut self.connectivity
    }

    pub fn analysis(&self) -> &BottleAnalyzer {
        &self.analysis
    }
}

// ── Internal ──────────────────────────────────────────────────

fn apply_command<C: LoadCellPort>(
    weight: &mut WeightSensor<C>,
    calibration_samples: u8,
    cmd: FridgeCommand,
    sink: &mut impl EventSink,
) {
    match cmd {
        FridgeCommand::ZeroCalibration => {
            let offset = weight.read_average(calibration_samples);
            weight.set_offset(offset);
            info!("Calibration: new zero offset {}", offset);
            sink.emit(&FridgeEvent::Calibrated { offset });
        }
    }
}

/// Weight with three decimals; a reading that rounds to zero is always
/// `0.000`, never `-0.000`.
fn telemetry_payload(weight: f32) -> String {
    let rounded = (weight * 1000.0).round() / 1000.0;
    let rounded = if rounded.abs() < 0.0005 { 0.0 } else { rounded };
    format!("{rounded:.3}")
}

/// Returns `true` when the message went out.
fn publish_or_report<N: NetworkPort, S: SessionPort>(
    connectivity: &mut ConnectivityManager<N, S>,
    topic: &str,
    payload: &[u8],
    retain: bool,
    sink: &mut impl EventSink,
) -> bool {
    match connectivity.publish(topic, payload, retain) {
        Ok(()) => true,
        Err(e) => {
            warn!("Publish to '{}' failed — {}", topic, e);
            sink.emit(&FridgeEvent::PublishFailed {
                topic: topic.to_owned(),
            });
            false
        }
    }
}

/// New associations / sessions made during one `ensure_connected`.
#[derive(Debug, Clone, Copy, Default)]
struct Bounce {
    rejoined: bool,
    reconnected: bool,
}

fn emit_transitions(
    before: ConnectionState,
    now: ConnectionState,
    bounce: Bounce,
    sink: &mut impl EventSink,
) {
    if before.session_up() && (!now.session_up() || bounce.reconnected) {
        sink.emit(&FridgeEvent::SessionDown);
    }
    if before.network_up() && (!now.network_up() || bounce.rejoined) {
        sink.emit(&FridgeEvent::NetworkDown);
    }
    if now.network_up() && (!before.network_up() || bounce.rejoined) {
        sink.emit(&FridgeEvent::NetworkUp);
    }
    if bounce.reconnected {
        sink.emit(&FridgeEvent::SessionUp);
    }
}
