//! Inbound commands to the application service.
//!
//! Commands arrive as MQTT messages inside the device namespace.  Routing
//! compares the full topic string for equality; everything that does not
//! name a command (including our own telemetry echoed back by the broker)
//! is ignored.

use super::ports::InboundMessage;
use super::topics::Topics;

/// Commands that the broker can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FridgeCommand {
    /// Capture the current averaged raw reading as the new zero offset.
    /// The payload is not inspected.
    ZeroCalibration,
}

impl FridgeCommand {
    /// Map an inbound topic onto a command.
    pub fn route(topics: &Topics, topic: &str) -> Option<Self> {
        if topic == topics.reset {
            Some(Self::ZeroCalibration)
        } else {
            None
        }
    }

    /// Convenience wrapper over [`route`](Self::route) for a whole message.
    pub fn from_message(topics: &Topics, msg: &InboundMessage) -> Option<Self> {
        Self::route(topics, &msg.topic)
    }
}
