//! Connectivity manager — WiFi association plus MQTT session lifecycle.
//!
//! Two layers, both re-evaluated on every call to
//! [`ensure_connected`](ConnectivityManager::ensure_connected):
//!
//! ```text
//!   Network  DOWN ──associate(first candidate that works)──▶ UP
//!            UP   ──link silently lost (seen on next poll)──▶ DOWN
//!
//!   Session  DISCONNECTED ──[network UP] connect + LWT──▶ CONNECTED
//!                           └─ resubscribe <prefix>#
//!                           └─ announce online=true (retained)
//!            CONNECTED ──[link lost]──▶ online=false, torn down ──▶ DISCONNECTED
//! ```
//!
//! A link that is lost and re-associated within the same call still tears
//! the session down, so the new association always gets a fresh session.
//!
//! There is no backoff and no attempt limit: a failed attempt simply waits
//! for the next control tick.  Subscriptions are reinstalled after every
//! successful connect because nothing is assumed to survive a dropped
//! session.

use log::{debug, info, trace, warn};

use crate::app::ports::{InboundMessage, LastWill, NetworkPort, SessionOptions, SessionPort};
use crate::app::topics::Topics;
use crate::config::{MAX_WIFI_NETWORKS, SystemConfig, WifiCredential};
use crate::error::CommsError;

/// Retained liveness payloads on the `online` topic.
const ONLINE_PAYLOAD: &[u8] = b"true";
const OFFLINE_PAYLOAD: &[u8] = b"false";

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

/// Snapshot of both layers.  A session is never reported up without the
/// network underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    network_up: bool,
    session_up: bool,
}

impl ConnectionState {
    pub const DOWN: Self = Self {
        network_up: false,
        session_up: false,
    };

    pub fn new(network_up: bool, session_up: bool) -> Self {
        Self {
            network_up,
            session_up: network_up && session_up,
        }
    }

    pub fn network_up(&self) -> bool {
        self.network_up
    }

    pub fn session_up(&self) -> bool {
        self.session_up
    }
}

// ───────────────────────────────────────────────────────────────
// Manager
// ───────────────────────────────────────────────────────────────

pub struct ConnectivityManager<N, S> {
    network: N,
    session: S,
    credentials: heapless::Vec<WifiCredential, MAX_WIFI_NETWORKS>,
    broker_host: heapless::String<64>,
    broker_port: u16,
    client_id: heapless::String<32>,
    topics: Topics,
    state: ConnectionState,
    associations: u32,
    sessions_established: u32,
}

impl<N: NetworkPort, S: SessionPort> ConnectivityManager<N, S> {
    pub fn new(network: N, session: S, config: &SystemConfig, topics: Topics) -> Self {
        if config.wifi_networks.is_empty() {
            warn!("Connectivity: no WiFi networks configured, will stay offline");
        }
        Self {
            network,
            session,
            credentials: config.wifi_networks.clone(),
            broker_host: config.broker_host.clone(),
            broker_port: config.broker_port,
            client_id: config.client_id.clone(),
            topics,
            state: ConnectionState::DOWN,
            associations: 0,
            sessions_established: 0,
        }
    }

    /// Bring both layers up as far as currently possible.
    pub fn ensure_connected(&mut self) -> ConnectionState {
        let (network_up, link_lost) = self.ensure_network();
        if link_lost || !network_up {
            self.drop_session();
        }
        let session_up = network_up && self.ensure_session();
        self.state = ConnectionState::new(network_up, session_up);
        self.state
    }

    /// Drain every pending inbound message into `handler`, in arrival order.
    /// Returns how many were delivered.
    pub fn poll_inbound(&mut self, mut handler: impl FnMut(&InboundMessage)) -> usize {
        if !self.state.session_up {
            return 0;
        }
        let mut delivered = 0;
        while let Some(msg) = self.session.poll() {
            trace!("MQTT: inbound '{}' ({} bytes)", msg.topic, msg.payload.len());
            handler(&msg);
            delivered += 1;
        }
        delivered
    }

    /// Publish through the current session.
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        if !self.state.session_up {
            return Err(CommsError::MqttNotConnected);
        }
        self.session.publish(topic, payload, retain)
    }

    // ── Queries ───────────────────────────────────────────────

    /// State as of the last [`ensure_connected`](Self::ensure_connected).
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of successful WiFi associations since boot.
    pub fn associations(&self) -> u32 {
        self.associations
    }

    /// Number of successful session establishments since boot.
    pub fn sessions_established(&self) -> u32 {
        self.sessions_established
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    // ── Network layer ─────────────────────────────────────────

    /// Returns `(up, lost)`; `lost` is set when a link that was up at the
    /// previous check has gone, even if a candidate was joined again since.
    fn ensure_network(&mut self) -> (bool, bool) {
        if self.network.is_associated() {
            return (true, false);
        }
        let lost = self.state.network_up;
        if lost {
            warn!("WiFi: association lost");
        }

        for cred in &self.credentials {
            match self.network.associate(cred) {
                Ok(()) => {
                    self.associations = self.associations.wrapping_add(1);
                    info!("WiFi: associated with '{}'", cred.ssid);
                    return (true, lost);
                }
                Err(e) => debug!("WiFi: '{}' failed — {}", cred.ssid, e),
            }
        }
        (false, lost)
    }

    // ── Session layer ─────────────────────────────────────────

    fn ensure_session(&mut self) -> bool {
        if self.session.is_connected() {
            return true;
        }
        if self.state.session_up {
            warn!("MQTT: session lost");
        }

        let options = SessionOptions {
            broker_host: &self.broker_host,
            broker_port: self.broker_port,
            client_id: &self.client_id,
            last_will: LastWill {
                topic: &self.topics.online,
                payload: OFFLINE_PAYLOAD,
                retain: true,
            },
        };
        if let Err(e) = self.session.connect(&options) {
            debug!(
                "MQTT: connect to {}:{} failed — {}",
                self.broker_host, self.broker_port, e
            );
            return false;
        }

        if let Err(e) = self.session.subscribe(&self.topics.subscription) {
            // Without the subscription commands would be lost silently;
            // start over on the next tick instead.
            warn!("MQTT: subscribe '{}' failed ({}), dropping session", self.topics.subscription, e);
            self.retire_session();
            return false;
        }
        // Announced only once the session can take commands.
        if let Err(e) = self.session.publish(&self.topics.online, ONLINE_PAYLOAD, true) {
            warn!("MQTT: online announcement failed — {}", e);
        }

        self.sessions_established = self.sessions_established.wrapping_add(1);
        info!(
            "MQTT: connected as '{}' to {}:{} (session #{})",
            self.client_id, self.broker_host, self.broker_port, self.sessions_established
        );
        true
    }

    fn drop_session(&mut self) {
        if self.state.session_up || self.session.is_connected() {
            warn!("MQTT: network link lost, tearing down session");
            self.retire_session();
        }
        self.state.session_up = false;
    }

    /// Best-effort `online=false` before a clean disconnect, which makes the
    /// broker discard the last will.
    fn retire_session(&mut self) {
        if let Err(e) = self.session.publish(&self.topics.online, OFFLINE_PAYLOAD, true) {
            debug!("MQTT: offline announcement failed — {}", e);
        }
        self.session.disconnect();
    }
}
