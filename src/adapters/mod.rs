//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to               |
//! |----------------|--------------------|---------------------------|
//! | `log_sink`     | EventSink          | Serial log output         |
//! | `mqtt`         | SessionPort        | ESP-IDF MQTT / sim broker |
//! | `wifi`         | NetworkPort        | ESP-IDF WiFi STA          |
//!
//! Sensor and housekeeping ports are implemented next to their hardware in
//! `sensors::light`, `drivers::hx711` and `drivers::watchdog`.

pub mod log_sink;
pub mod mqtt;
pub mod wifi;
