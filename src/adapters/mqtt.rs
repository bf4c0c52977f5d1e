//! MQTT session adapter.
//!
//! Implements [`SessionPort`] on top of a broker connection.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//!   The client runs its own task; its event callback forwards received
//!   messages through an `mpsc` channel that [`poll`](SessionPort::poll)
//!   drains from the control loop, and tracks connection status in atomic
//!   flags.  The first `Disconnected` event retires the client for good:
//!   a reconnect made by esp-mqtt on its own would come back without the
//!   namespace subscription, so only the connectivity manager reconnects.
//! - **all other targets**: [`SimBroker`], an in-process broker with
//!   retained messages, last-will delivery on unclean drop, and
//!   per-session subscriptions, so host tests exercise the same reconnect
//!   paths as the device.

use log::{debug, info};

use crate::app::ports::{InboundMessage, SessionOptions, SessionPort};
use crate::error::CommsError;

#[cfg(not(target_os = "espidf"))]
pub use sim::{PublishedMessage, SimBroker};

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{Receiver, channel};
    use std::time::Duration;

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
    };
    use log::warn;

    use crate::app::ports::{InboundMessage, SessionOptions};
    use crate::error::CommsError;

    const CONNECT_TIMEOUT_MS: u32 = 5_000;
    const CONNECT_POLL_MS: u32 = 10;

    pub(super) struct Link {
        client: EspMqttClient<'static>,
        connected: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
        inbound: Receiver<InboundMessage>,
    }

    impl Link {
        pub(super) fn open(options: &SessionOptions<'_>) -> Result<Self, CommsError> {
            let url = format!("mqtt://{}:{}", options.broker_host, options.broker_port);
            let conf = MqttClientConfiguration {
                client_id: Some(options.client_id),
                lwt: Some(LwtConfiguration {
                    topic: options.last_will.topic,
                    payload: options.last_will.payload,
                    qos: QoS::AtMostOnce,
                    retain: options.last_will.retain,
                }),
                ..Default::default()
            };

            let connected = Arc::new(AtomicBool::new(false));
            let dropped = Arc::new(AtomicBool::new(false));
            let (tx, inbound) = channel();
            let (up_flag, dropped_flag) = (connected.clone(), dropped.clone());
            let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
                EventPayload::Connected(_) => up_flag.store(true, Ordering::Release),
                EventPayload::Disconnected => {
                    dropped_flag.store(true, Ordering::Release);
                    up_flag.store(false, Ordering::Release);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    // Receiver gone means the link is being torn down.
                    let _ = tx.send(InboundMessage {
                        topic: topic.to_owned(),
                        payload: data.to_vec(),
                    });
                }
                EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
                _ => {}
            })
            .map_err(|_| CommsError::MqttConnectFailed)?;

            let mut waited = 0;
            while !connected.load(Ordering::Acquire) {
                if waited >= CONNECT_TIMEOUT_MS || dropped.load(Ordering::Acquire) {
                    return Err(CommsError::MqttConnectFailed);
                }
                std::thread::sleep(Duration::from_millis(u64::from(CONNECT_POLL_MS)));
                waited += CONNECT_POLL_MS;
            }

            Ok(Self {
                client,
                connected,
                dropped,
                inbound,
            })
        }

        /// Never true again once the broker link has dropped.
        pub(super) fn is_up(&self) -> bool {
            !self.dropped.load(Ordering::Acquire) && self.connected.load(Ordering::Acquire)
        }

        pub(super) fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
            self.client
                .publish(topic, QoS::AtMostOnce, retain, payload)
                .map(|_| ())
                .map_err(|_| CommsError::MqttPublishFailed)
        }

        pub(super) fn subscribe(&mut self, filter: &str) -> Result<(), CommsError> {
            self.client
                .subscribe(filter, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|_| CommsError::MqttSubscribeFailed)
        }

        pub(super) fn poll(&mut self) -> Option<InboundMessage> {
            self.inbound.try_recv().ok()
        }
    }
}

#[cfg(target_os = "espidf")]
pub struct MqttAdapter {
    link: Option<platform::Link>,
}

#[cfg(target_os = "espidf")]
impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl MqttAdapter {
    pub fn new() -> Self {
        Self { link: None }
    }
}

#[cfg(target_os = "espidf")]
impl SessionPort for MqttAdapter {
    fn connect(&mut self, options: &SessionOptions<'_>) -> Result<(), CommsError> {
        // Dropping the previous client tears down its task and socket.
        self.link = None;
        info!(
            "MQTT: connecting to {}:{} as '{}'",
            options.broker_host, options.broker_port, options.client_id
        );
        self.link = Some(platform::Link::open(options)?);
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.link.as_ref().is_some_and(|l| l.is_up())
    }

    fn disconnect(&mut self) {
        if self.link.take().is_some() {
            debug!("MQTT: client dropped");
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        let link = self.link.as_mut().ok_or(CommsError::MqttNotConnected)?;
        link.publish(topic, payload, retain)
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), CommsError> {
        let link = self.link.as_mut().ok_or(CommsError::MqttNotConnected)?;
        link.subscribe(filter)
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.link.as_mut()?.poll()
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated broker
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::cell::RefCell;
    use std::collections::{BTreeMap, VecDeque};
    use std::rc::Rc;

    use log::{debug, info};

    use crate::app::ports::InboundMessage;
    use crate::app::topics::topic_matches;

    /// Everything the broker accepted, in order, for test inspection.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PublishedMessage {
        pub topic: String,
        pub payload: Vec<u8>,
        pub retain: bool,
        /// `None` for messages injected from outside any session.
        pub client_id: Option<String>,
    }

    struct Will {
        topic: String,
        payload: Vec<u8>,
        retain: bool,
    }

    struct Session {
        token: u32,
        client_id: String,
        will: Will,
        filters: Vec<String>,
        queue: VecDeque<InboundMessage>,
    }

    #[derive(Default)]
    struct State {
        unreachable: bool,
        fail_publish: bool,
        fail_subscribe: bool,
        next_token: u32,
        sessions: Vec<Session>,
        retained: BTreeMap<String, Vec<u8>>,
        history: Vec<PublishedMessage>,
    }

    impl State {
        fn route(&mut self, msg: PublishedMessage) {
            if msg.retain {
                if msg.payload.is_empty() {
                    self.retained.remove(&msg.topic);
                } else {
                    self.retained.insert(msg.topic.clone(), msg.payload.clone());
                }
            }
            for s in &mut self.sessions {
                if s.filters.iter().any(|f| topic_matches(f, &msg.topic)) {
                    s.queue.push_back(InboundMessage {
                        topic: msg.topic.clone(),
                        payload: msg.payload.clone(),
                    });
                }
            }
            self.history.push(msg);
        }

        fn session_mut(&mut self, token: u32) -> Option<&mut Session> {
            self.sessions.iter_mut().find(|s| s.token == token)
        }
    }

    /// Shared handle to one in-process broker.  Clones refer to the same
    /// broker, so a test keeps one handle while the adapter owns another.
    #[derive(Clone, Default)]
    pub struct SimBroker(Rc<RefCell<State>>);

    impl SimBroker {
        pub fn new() -> Self {
            Self::default()
        }

        // ── Fault injection ───────────────────────────────────

        /// Refuse (or accept again) new connections.
        pub fn set_reachable(&self, reachable: bool) {
            self.0.borrow_mut().unreachable = !reachable;
        }

        pub fn set_fail_publish(&self, fail: bool) {
            self.0.borrow_mut().fail_publish = fail;
        }

        pub fn set_fail_subscribe(&self, fail: bool) {
            self.0.borrow_mut().fail_subscribe = fail;
        }

        /// Drop every session of `client_id` as if the TCP link died,
        /// publishing its last will.
        pub fn drop_client(&self, client_id: &str) {
            let mut st = self.0.borrow_mut();
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut st.sessions)
                .into_iter()
                .partition(|s| s.client_id == client_id);
            st.sessions = kept;
            for s in gone {
                info!("Broker(sim): '{}' dropped, publishing will", s.client_id);
                st.route(PublishedMessage {
                    topic: s.will.topic,
                    payload: s.will.payload,
                    retain: s.will.retain,
                    client_id: None,
                });
            }
        }

        // ── Other clients ─────────────────────────────────────

        /// Publish as some other client on the broker.
        pub fn publish(&self, topic: &str, payload: &[u8], retain: bool) {
            self.0.borrow_mut().route(PublishedMessage {
                topic: topic.to_owned(),
                payload: payload.to_vec(),
                retain,
                client_id: None,
            });
        }

        // ── Inspection ────────────────────────────────────────

        pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
            self.0.borrow().retained.get(topic).cloned()
        }

        pub fn history(&self) -> Vec<PublishedMessage> {
            self.0.borrow().history.clone()
        }

        /// Messages on `topic`, oldest first.
        pub fn published_on(&self, topic: &str) -> Vec<PublishedMessage> {
            self.0
                .borrow()
                .history
                .iter()
                .filter(|m| m.topic == topic)
                .cloned()
                .collect()
        }

        pub fn session_count(&self) -> usize {
            self.0.borrow().sessions.len()
        }

        pub fn subscriptions(&self, client_id: &str) -> Vec<String> {
            self.0
                .borrow()
                .sessions
                .iter()
                .filter(|s| s.client_id == client_id)
                .flat_map(|s| s.filters.iter().cloned())
                .collect()
        }

        // ── Adapter side ──────────────────────────────────────

        pub(super) fn open(
            &self,
            client_id: &str,
            will_topic: &str,
            will_payload: &[u8],
            will_retain: bool,
        ) -> Option<u32> {
            let mut st = self.0.borrow_mut();
            if st.unreachable {
                return None;
            }
            // Same client id takes the old session over; clean session.
            st.sessions.retain(|s| s.client_id != client_id);
            st.next_token = st.next_token.wrapping_add(1);
            let token = st.next_token;
            st.sessions.push(Session {
                token,
                client_id: client_id.to_owned(),
                will: Will {
                    topic: will_topic.to_owned(),
                    payload: will_payload.to_vec(),
                    retain: will_retain,
                },
                filters: Vec::new(),
                queue: VecDeque::new(),
            });
            debug!("Broker(sim): session {} opened for '{}'", token, client_id);
            Some(token)
        }

        pub(super) fn close(&self, token: u32) {
            self.0.borrow_mut().sessions.retain(|s| s.token != token);
        }

        pub(super) fn is_open(&self, token: u32) -> bool {
            self.0.borrow().sessions.iter().any(|s| s.token == token)
        }

        /// `None` if the session is gone, `Some(false)` on an injected fault.
        pub(super) fn publish_from(&self, token: u32, topic: &str, payload: &[u8], retain: bool) -> Option<bool> {
            let mut st = self.0.borrow_mut();
            let client_id = st.session_mut(token)?.client_id.clone();
            if st.fail_publish {
                return Some(false);
            }
            st.route(PublishedMessage {
                topic: topic.to_owned(),
                payload: payload.to_vec(),
                retain,
                client_id: Some(client_id),
            });
            Some(true)
        }

        /// Retained messages matching the new filter are queued at once.
        pub(super) fn subscribe(&self, token: u32, filter: &str) -> Option<bool> {
            let mut st = self.0.borrow_mut();
            if st.fail_subscribe {
                return st.session_mut(token).map(|_| false);
            }
            let retained: Vec<InboundMessage> = st
                .retained
                .iter()
                .filter(|(topic, _)| topic_matches(filter, topic))
                .map(|(topic, payload)| InboundMessage {
                    topic: topic.clone(),
                    payload: payload.clone(),
                })
                .collect();
            let session = st.session_mut(token)?;
            if !session.filters.iter().any(|f| f == filter) {
                session.filters.push(filter.to_owned());
            }
            session.queue.extend(retained);
            Some(true)
        }

        pub(super) fn take(&self, token: u32) -> Option<InboundMessage> {
            self.0.borrow_mut().session_mut(token)?.queue.pop_front()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct MqttAdapter {
    broker: SimBroker,
    token: Option<u32>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    pub fn new(broker: SimBroker) -> Self {
        Self {
            broker,
            token: None,
        }
    }

    fn live_token(&mut self) -> Result<u32, CommsError> {
        match self.token {
            Some(t) if self.broker.is_open(t) => Ok(t),
            _ => Err(CommsError::MqttNotConnected),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SessionPort for MqttAdapter {
    fn connect(&mut self, options: &SessionOptions<'_>) -> Result<(), CommsError> {
        if let Some(t) = self.token.take() {
            self.broker.close(t);
        }
        let will = &options.last_will;
        let token = self
            .broker
            .open(options.client_id, will.topic, will.payload, will.retain)
            .ok_or(CommsError::MqttConnectFailed)?;
        self.token = Some(token);
        info!(
            "MQTT(sim): connected to {}:{} as '{}'",
            options.broker_host, options.broker_port, options.client_id
        );
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.live_token().is_ok()
    }

    /// Clean disconnect: the will is discarded.
    fn disconnect(&mut self) {
        if let Some(t) = self.token.take() {
            self.broker.close(t);
            debug!("MQTT(sim): disconnected");
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        let token = self.live_token()?;
        match self.broker.publish_from(token, topic, payload, retain) {
            Some(true) => Ok(()),
            Some(false) => Err(CommsError::MqttPublishFailed),
            None => Err(CommsError::MqttNotConnected),
        }
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), CommsError> {
        let token = self.live_token()?;
        match self.broker.subscribe(token, filter) {
            Some(true) => Ok(()),
            Some(false) => Err(CommsError::MqttSubscribeFailed),
            None => Err(CommsError::MqttNotConnected),
        }
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.broker.take(self.token?)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
