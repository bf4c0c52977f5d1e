//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::FridgeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`FridgeEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &FridgeEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            FridgeEvent::Started(door) => {
                info!("START | door={:?}", door);
            }
            FridgeEvent::DoorChanged(door) => {
                info!("DOOR | {}", door.payload());
            }
            FridgeEvent::Telemetry { weight } => {
                info!("TELEM | weight={:.3}", weight);
            }
            FridgeEvent::NetworkUp => info!("NET | up"),
            FridgeEvent::NetworkDown => warn!("NET | down"),
            FridgeEvent::SessionUp => info!("MQTT | session up"),
            FridgeEvent::SessionDown => warn!("MQTT | session down"),
            FridgeEvent::BottlesTaken { count } => {
                info!("BOTTLES | {} taken", count);
            }
            FridgeEvent::Calibrated { offset } => {
                info!("CAL | zero offset={}", offset);
            }
            FridgeEvent::PublishFailed { topic } => {
                warn!("MQTT | publish to '{}' failed", topic);
            }
        }
    }
}
