//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`], the hexagonal boundary for link-layer
//! association.  Candidate selection and retry pacing live in
//! [`ConnectivityManager`](crate::connectivity::ConnectivityManager); this
//! adapter only knows how to join one network and report whether it is
//! still joined.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over `EspWifi`.
//! - **all other targets**: a simulated set of reachable access points for
//!   host-side tests.

use log::info;

use crate::app::ports::NetworkPort;
use crate::config::{WifiCredential, validate_password, validate_ssid};
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: access points in range, with the password they accept.
    #[cfg(not(target_os = "espidf"))]
    sim_reachable: Vec<WifiCredential>,
    #[cfg(not(target_os = "espidf"))]
    sim_joined: bool,
    ssid: heapless::String<32>,
    attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            wifi,
            ssid: heapless::String::new(),
            attempts: 0,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            sim_reachable: Vec::new(),
            sim_joined: false,
            ssid: heapless::String::new(),
            attempts: 0,
        }
    }

    /// SSID of the most recent successful association.
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Total association attempts since construction.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_associate(&mut self, credential: &WifiCredential) -> Result<(), CommsError> {
        let auth_method = if credential.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: credential
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidSsid)?,
            password: credential
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.wifi
            .set_configuration(&config)
            .map_err(|_| CommsError::WifiConnectFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| CommsError::WifiConnectFailed)?;
        }
        self.wifi.connect().map_err(|_| CommsError::WifiConnectFailed)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| CommsError::WifiConnectFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_associate(&mut self, credential: &WifiCredential) -> Result<(), CommsError> {
        let Some(ap) = self.sim_reachable.iter().find(|ap| ap.ssid == credential.ssid) else {
            info!("WiFi(sim): '{}' not in range", credential.ssid);
            return Err(CommsError::WifiConnectFailed);
        };
        if ap.password != credential.password {
            log::warn!("WiFi(sim): '{}' rejected credentials", credential.ssid);
            return Err(CommsError::WifiConnectFailed);
        }
        self.sim_joined = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_associated(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_associated(&mut self) -> bool {
        self.sim_joined
    }
}

// ── Simulation controls ───────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    /// Put an access point in range.
    pub fn sim_add_network(&mut self, credential: WifiCredential) {
        self.sim_reachable.retain(|ap| ap.ssid != credential.ssid);
        self.sim_reachable.push(credential);
    }

    /// Take an access point out of range; drops the link if it was joined.
    pub fn sim_remove_network(&mut self, ssid: &str) {
        self.sim_reachable.retain(|ap| ap.ssid != ssid);
        if self.ssid == ssid {
            self.sim_joined = false;
        }
    }

    /// Lose the link without any notification.
    pub fn sim_drop_link(&mut self) {
        self.sim_joined = false;
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiAdapter {
    fn is_associated(&mut self) -> bool {
        self.platform_is_associated()
    }

    fn associate(&mut self, credential: &WifiCredential) -> Result<(), CommsError> {
        validate_ssid(&credential.ssid)?;
        validate_password(&credential.password)?;

        self.attempts = self.attempts.wrapping_add(1);
        info!("WiFi: connecting to '{}'", credential.ssid);
        self.platform_associate(credential)?;

        self.ssid.clone_from(&credential.ssid);
        info!("WiFi: connected to '{}'", self.ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
