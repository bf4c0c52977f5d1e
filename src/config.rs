//! System configuration parameters
//!
//! All tunable parameters for the fridge monitor.  Values are fixed at build
//! time: defaults below, optionally overridden by a JSON document passed in
//! the `FRIDGEWATCH_CONFIG` environment variable when the firmware is built.
//! Only the fields present in that document are overridden.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{CommsError, Error};

/// Maximum number of candidate access points.
pub const MAX_WIFI_NETWORKS: usize = 4;

/// Upper bound for the bottle analysis stability window.
pub const MAX_STABLE_WINDOW: usize = 32;

/// One candidate access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredential {
    pub ssid: heapless::String<32>,
    /// Empty for open networks.
    pub password: heapless::String<64>,
}

impl WifiCredential {
    /// Build a validated credential.
    pub fn new(ssid: &str, password: &str) -> Result<Self, CommsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut cred = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        cred.ssid.push_str(ssid).map_err(|_| CommsError::InvalidSsid)?;
        cred.password
            .push_str(password)
            .map_err(|_| CommsError::InvalidPassword)?;
        Ok(cred)
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Network ---
    /// Candidate access points, tried in list order.
    pub wifi_networks: heapless::Vec<WifiCredential, MAX_WIFI_NETWORKS>,
    /// MQTT broker host (name or dotted quad).
    pub broker_host: heapless::String<64>,
    /// MQTT broker TCP port.
    pub broker_port: u16,
    /// Fixed client identity presented to the broker.
    pub client_id: heapless::String<32>,
    /// Topic namespace, must end in `/`.
    pub topic_prefix: heapless::String<64>,

    // --- Door detection ---
    /// Light level above which the door counts as open.
    pub light_threshold: u16,
    /// Confirmatory samples that must agree with the first one.
    pub debounce_samples: u8,
    /// Delay between confirmatory samples (milliseconds).
    pub debounce_sample_delay_ms: u32,

    // --- Load cell ---
    /// Raw units per kilogram.
    pub calibration_factor: f32,
    /// Zero offset used until the first reset command.
    pub initial_offset: i32,
    /// Conversions averaged when capturing a new zero offset.
    pub calibration_samples: u8,
    /// Conversions averaged for each telemetry reading.
    pub telemetry_samples: u8,

    // --- Bottle analysis ---
    /// Readings that must agree before a weight counts as settled.
    pub stable_window: u8,
    /// Largest sample standard deviation of a settled window (kg).
    pub stable_deviation: f32,
    /// Weight of one full bottle (kg).
    pub bottle_weight: f32,
    /// Allowed distance from a whole number of bottles (kg).
    pub bottle_tolerance: f32,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub loop_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Network
            wifi_networks: heapless::Vec::new(),
            broker_host: heapless_str("158.255.212.248"),
            broker_port: 1883,
            client_id: heapless_str("fridge"),
            topic_prefix: heapless_str("devlol/h19/fridge/"),

            // Door detection
            light_threshold: 50,
            debounce_samples: 10,
            debounce_sample_delay_ms: 10,

            // Load cell
            calibration_factor: 11_600.0,
            initial_offset: 8_458_217,
            calibration_samples: 10,
            telemetry_samples: 1,

            // Bottle analysis
            stable_window: 10,
            stable_deviation: 0.015,
            bottle_weight: 0.88,
            bottle_tolerance: 0.1,

            // Timing
            loop_interval_ms: 1000, // 1 Hz
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON document over the defaults and
    /// validate the result.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Configuration baked in at build time.
    ///
    /// Falls back to [`SystemConfig::default`] when `FRIDGEWATCH_CONFIG` was
    /// not set or does not validate.
    pub fn build_time() -> Self {
        match option_env!("FRIDGEWATCH_CONFIG") {
            Some(json) => Self::from_json(json).unwrap_or_else(|e| {
                warn!("FRIDGEWATCH_CONFIG rejected ({}), using defaults", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), Error> {
        for cred in &self.wifi_networks {
            validate_ssid(&cred.ssid).map_err(|_| Error::Config("wifi ssid invalid"))?;
            validate_password(&cred.password)
                .map_err(|_| Error::Config("wifi password invalid"))?;
        }
        if self.broker_host.is_empty() {
            return Err(Error::Config("broker_host must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(Error::Config("broker_port must be non-zero"));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config("client_id must not be empty"));
        }
        if self.topic_prefix.is_empty() || !self.topic_prefix.ends_with('/') {
            return Err(Error::Config("topic_prefix must be non-empty and end in '/'"));
        }
        if !self.calibration_factor.is_finite() || self.calibration_factor == 0.0 {
            return Err(Error::Config("calibration_factor must be finite and non-zero"));
        }
        if !(1..=100).contains(&self.debounce_samples) {
            return Err(Error::Config("debounce_samples must be 1–100"));
        }
        if self.calibration_samples == 0 || self.telemetry_samples == 0 {
            return Err(Error::Config("averaging sample counts must be at least 1"));
        }
        if !(2..=MAX_STABLE_WINDOW).contains(&usize::from(self.stable_window)) {
            return Err(Error::Config("stable_window must be 2–32"));
        }
        if !(self.stable_deviation.is_finite() && self.stable_deviation > 0.0) {
            return Err(Error::Config("stable_deviation must be positive"));
        }
        if !(self.bottle_weight.is_finite() && self.bottle_weight > 0.0) {
            return Err(Error::Config("bottle_weight must be positive"));
        }
        if !(self.bottle_tolerance.is_finite()
            && self.bottle_tolerance >= 0.0
            && self.bottle_tolerance < self.bottle_weight / 2.0)
        {
            return Err(Error::Config("bottle_tolerance must be below half a bottle"));
        }
        if !(100..=60_000).contains(&self.loop_interval_ms) {
            return Err(Error::Config("loop_interval_ms must be 100–60000"));
        }
        Ok(())
    }
}

fn heapless_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    // Literal defaults always fit their capacity.
    let _ = out.push_str(s);
    out
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub(crate) fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidSsid);
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidPassword);
    }
    Ok(())
}
