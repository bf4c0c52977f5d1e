//! Unified error types for the fridge firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping
//! configuration and connectivity error handling uniform.  All variants are `Copy` so they
//! can be passed through the control loop without allocation.
//!
//! Once the control loop is running nothing here is fatal: connectivity
//! errors only mean "not up yet, try again next tick".

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read.
    Sensor(SensorError),
    /// The network or messaging session failed.
    Comms(CommsError),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC one-shot read returned an error code.
    AdcReadFailed,
    /// Load cell never signalled data-ready.
    LoadCellNotReady,
    /// GPIO access failed.
    GpioFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::LoadCellNotReady => write!(f, "load cell not ready"),
            Self::GpioFailed => write!(f, "GPIO access failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// SSID is empty, too long, or not printable ASCII.
    InvalidSsid,
    /// Password is neither empty (open network) nor 8–64 bytes.
    InvalidPassword,
    /// Association with the access point failed.
    WifiConnectFailed,
    /// The broker refused or never answered the session request.
    MqttConnectFailed,
    /// An operation needed a session but none is established.
    MqttNotConnected,
    /// Publish was rejected by the client.
    MqttPublishFailed,
    /// Subscribe was rejected by the client.
    MqttSubscribeFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::WifiConnectFailed => write!(f, "WiFi connection failed"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttNotConnected => write!(f, "MQTT session not connected"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}
