//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FridgeService (domain)
//! ```
//!
//! Driven adapters (light sensor, load cell, WiFi, MQTT, watchdog, event
//! sinks) implement these traits.  The domain components own or borrow them
//! through generics, so the control logic never touches hardware directly.
//!
//! Timing is not a port of its own: the debounce routine takes any
//! [`embedded_hal::delay::DelayNs`].

use crate::config::WifiCredential;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Ambient light sampling.  Any value is accepted as a valid sample.
pub trait LightSensorPort {
    fn read_light(&mut self) -> u16;
}

/// Raw load-cell conversions (signed, unscaled, no offset applied).
pub trait LoadCellPort {
    fn read_raw(&mut self) -> i32;
}

// ───────────────────────────────────────────────────────────────
// Network port (link layer)
// ───────────────────────────────────────────────────────────────

/// WiFi station association.
///
/// Polling model: the link may drop at any time and is only noticed the
/// next time [`is_associated`](NetworkPort::is_associated) is asked.
pub trait NetworkPort {
    /// Whether the station is currently associated with an access point.
    fn is_associated(&mut self) -> bool;

    /// Attempt a synchronous association with one access point.
    fn associate(&mut self, credential: &WifiCredential) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Session port (pub/sub transport)
// ───────────────────────────────────────────────────────────────

/// Message the broker publishes on our behalf if we vanish uncleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastWill<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub retain: bool,
}

/// Everything needed to open a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions<'a> {
    pub broker_host: &'a str,
    pub broker_port: u16,
    pub client_id: &'a str,
    pub last_will: LastWill<'a>,
}

/// A message delivered to us by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// MQTT-style session.
///
/// Subscriptions do not survive a dropped session; callers resubscribe
/// after every successful [`connect`](SessionPort::connect).
pub trait SessionPort {
    /// Open a session synchronously.  Success means the broker accepted us.
    fn connect(&mut self, options: &SessionOptions<'_>) -> Result<(), CommsError>;

    /// Whether the session is still alive.
    fn is_connected(&mut self) -> bool;

    /// Tear the session down locally.  Idempotent.
    fn disconnect(&mut self);

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError>;

    fn subscribe(&mut self, filter: &str) -> Result<(), CommsError>;

    /// Next pending inbound message, if any.  Never blocks.
    fn poll(&mut self) -> Option<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// Housekeeping port
// ───────────────────────────────────────────────────────────────

/// Runtime housekeeping the loop must service once per iteration
/// (watchdog feed, yielding to lower-level runtime tasks).
pub trait HousekeepingPort {
    fn service(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`FridgeEvent`](super::events::FridgeEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::FridgeEvent);
}
