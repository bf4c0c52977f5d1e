//! Outbound application events.
//!
//! The [`FridgeService`](super::service::FridgeService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  They mirror what goes
//! out over MQTT plus the connectivity transitions that never reach the
//! broker.

use crate::sensors::door::DoorState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum FridgeEvent {
    /// The service has started (carries the assumed initial door state).
    Started(DoorState),

    /// A debounced door transition was detected.
    DoorChanged(DoorState),

    /// A weight reading was published.
    Telemetry { weight: f32 },

    /// WiFi association came up.
    NetworkUp,

    /// WiFi association was lost.
    NetworkDown,

    /// The broker session was established (and subscriptions installed).
    SessionUp,

    /// The broker session was lost or torn down.
    SessionDown,

    /// Bottle analysis settled a door cycle with bottles missing.
    BottlesTaken { count: u32 },

    /// A new zero offset was captured.
    Calibrated { offset: i32 },

    /// An outbound publish was rejected.
    PublishFailed { topic: String },
}
