//! The MQTT client FSM: connect/subscribe/disconnect sequencing gated on a
//! radio's link/IP status, with subscription replay on reconnect.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result as AnyResult};
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration,
    MqttClientConfiguration, MqttProtocolVersion, QoS,
};
use log::{debug, info, warn};

use mqtt_pure::flags::all_init_mask;
use mqtt_pure::{MqttBrokerDef, MqttFlag, MqttFlags, MqttMessage, MqttState, ProtocolVersion};
use mqtt_pure::subscription::{SubscriptionSet, TopicCallback};
use rustyfarian_network_pure::{Backoff, Deadline, Fsm, FsmError, FsmResult, PollVerdict, RadioGate};

use crate::mailbox::{LatchedMqttState, MqttMailboxes};

const ROUTE_CAPACITY: usize = 8;

pub struct MqttClient {
    fsm: Fsm<MqttState, ROUTE_CAPACITY>,
    flags: MqttFlags,
    mailboxes: Arc<MqttMailboxes>,
    latched: LatchedMqttState,
    backoff: Backoff,
    next_retry: Option<Deadline>,
    broker: Option<MqttBrokerDef>,
    subscriptions: SubscriptionSet,
    radio: Option<Arc<dyn RadioGate + Send + Sync>>,
    client: Option<EspMqttClient<'static>>,
    _drain_thread: Option<thread::JoinHandle<()>>,
}

impl Default for MqttClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttClient {
    pub fn new() -> Self {
        Self {
            fsm: Fsm::new(MqttState::Uninit),
            flags: MqttFlags::empty(),
            mailboxes: Arc::new(MqttMailboxes::new()),
            latched: LatchedMqttState::default(),
            backoff: Backoff::new(),
            next_retry: None,
            broker: None,
            subscriptions: SubscriptionSet::new(),
            radio: None,
            client: None,
            _drain_thread: None,
        }
    }

    pub fn current_state(&self) -> MqttState {
        self.fsm.current()
    }

    /// Dependency injection before `init()`. The MQTT crate stays generic
    /// over [`RadioGate`] rather than depending on `rustyfarian-esp-idf-wifi`
    /// directly.
    pub fn set_radio(&mut self, radio: Arc<dyn RadioGate + Send + Sync>) {
        self.radio = Some(radio);
    }

    pub fn init(&mut self) -> FsmResult<()> {
        self.fsm.set_route(&[MqttState::Init, MqttState::Connecting])
    }

    /// Replaces the broker definition. If currently connected, replans
    /// `Disconnecting -> Disconnected -> Init -> Connecting` so the change
    /// takes effect; otherwise stores it for the next `Init` entry.
    pub fn set_broker(&mut self, def: MqttBrokerDef) -> bool {
        self.broker = Some(def);
        if self.fsm.current() == MqttState::Connected {
            self.fsm
                .set_route(&[
                    MqttState::Disconnecting,
                    MqttState::Disconnected,
                    MqttState::Init,
                    MqttState::Connecting,
                ])
                .is_ok()
        } else {
            true
        }
    }

    pub fn autoconnect(&mut self, enable: bool) {
        if enable {
            self.flags |= MqttFlag::Autoconnect;
        } else {
            self.flags -= MqttFlag::Autoconnect;
        }
    }

    pub fn autoconnect_enabled(&self) -> bool {
        self.flags.contains(MqttFlag::Autoconnect)
    }

    pub fn connected(&self) -> bool {
        self.fsm.current() == MqttState::Connected && self.latched.connected
    }

    pub fn mailboxes(&self) -> Arc<MqttMailboxes> {
        Arc::clone(&self.mailboxes)
    }

    /// Console `con`.
    pub fn connect(&mut self) -> FsmResult<()> {
        self.fsm
            .append_route(&[MqttState::Connecting, MqttState::Connected])
    }

    /// Console `discon`.
    pub fn disconnect(&mut self) -> FsmResult<()> {
        self.fsm
            .append_route(&[MqttState::Disconnecting, MqttState::Disconnected])
    }

    /// Valid only in `Connected`. Returns the broker-assigned message id;
    /// `PUBLISHED` arrives asynchronously and requires no FSM action.
    pub fn publish(&mut self, msg: &MqttMessage) -> FsmResult<i32> {
        if self.fsm.current() != MqttState::Connected {
            return Err(FsmError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(FsmError::NotConnected)?;
        let id = client
            .publish(msg.topic.as_str(), to_esp_qos(msg.qos), msg.retain, &msg.payload)
            .map_err(|_| FsmError::HardwareOrLibrary)?;
        Ok(id as i32)
    }

    /// In `Connected`: submits SUBSCRIBE and records the pending id. In any
    /// other state: only registers for replay at the next `Connected` entry.
    pub fn subscribe(
        &mut self,
        topic: &str,
        qos: u8,
        callback: Option<TopicCallback>,
    ) -> FsmResult<i32> {
        self.subscriptions.upsert(topic, qos, callback)?;
        if self.fsm.current() == MqttState::Connected {
            if let Some(client) = self.client.as_mut() {
                let id = client
                    .subscribe(topic, to_esp_qos(qos))
                    .map_err(|_| FsmError::HardwareOrLibrary)?;
                self.subscriptions.mark_pending(topic, id as i32);
                return Ok(id as i32);
            }
        }
        Ok(MqttMessage::UNASSIGNED)
    }

    pub fn unsubscribe(&mut self, topic: &str) -> FsmResult<i32> {
        if !self.subscriptions.remove(topic) {
            return Err(FsmError::BadParameter);
        }
        if self.fsm.current() == MqttState::Connected {
            if let Some(client) = self.client.as_mut() {
                let id = client
                    .unsubscribe(topic)
                    .map_err(|_| FsmError::HardwareOrLibrary)?;
                return Ok(id as i32);
            }
        }
        Ok(MqttMessage::UNASSIGNED)
    }

    pub fn poll(&mut self, now_ms: u64) -> PollVerdict {
        self.latched = self.mailboxes.latch();

        if let Some(id) = self.latched.suback_msg_id {
            if self.subscriptions.acknowledge(id) && self.subscriptions.all_acknowledged() {
                self.flags |= MqttFlag::SubsComplete;
            }
        }
        if let Some(id) = self.latched.unsuback_msg_id {
            debug!("mqtt: UNSUBACK id={id}");
        }

        self.dispatch_inbox();

        if self.latched.transport_error {
            self.mailboxes.transport_error.set(false);
            warn!("mqtt: transport error reported by event loop");
            if self.fsm.is_stable() && self.fsm.current() == MqttState::Connected {
                let _ = self
                    .fsm
                    .append_route(&[MqttState::Disconnecting, MqttState::Disconnected]);
            }
        }

        if self.auto_reconnect_due(now_ms) {
            self.next_retry = None;
            let _ = self
                .fsm
                .append_route(&[MqttState::Connecting, MqttState::Connected]);
        }

        if self.fsm.is_waiting(now_ms) {
            return PollVerdict::NoAction;
        }

        let Some(next) = self.fsm.peek_next() else {
            return self.idle_tick();
        };

        if !self.exit_satisfied(next) {
            return PollVerdict::NoAction;
        }

        match self.enter_state(next, now_ms) {
            Ok(()) => {
                self.fsm.advance(now_ms, 0);
                PollVerdict::Action
            }
            Err(FsmError::RadioDown) => {
                // §4.3: park until the radio gate opens instead of retrying
                // the same Connecting entry every tick.
                let _ = self.fsm.prepend_state(MqttState::Disconnected);
                PollVerdict::NoAction
            }
            Err(FsmError::Busy) | Err(FsmError::NotReady) => PollVerdict::NoAction,
            Err(_) => {
                self.fsm.mark_current_state(MqttState::Fault);
                PollVerdict::Action
            }
        }
    }

    fn idle_tick(&mut self) -> PollVerdict {
        if self.fsm.current() == MqttState::Connected
            && (!self.radio_gate_open() || self.latched.disconnected)
        {
            let _ = self
                .fsm
                .append_route(&[MqttState::Disconnecting, MqttState::Disconnected]);
            return PollVerdict::Action;
        }
        PollVerdict::NoAction
    }

    fn auto_reconnect_due(&mut self, now_ms: u64) -> bool {
        self.fsm.current() == MqttState::Disconnected
            && self.fsm.is_stable()
            && self.flags.contains(MqttFlag::Autoconnect)
            && self.broker.is_some()
            && self.radio_gate_open()
            && self.next_retry.map(|d| d.is_due(now_ms)).unwrap_or(true)
    }

    fn radio_gate_open(&self) -> bool {
        self.radio.as_ref().map(|r| r.gate_open()).unwrap_or(false)
    }

    fn exit_satisfied(&self, next: MqttState) -> bool {
        match self.fsm.current() {
            MqttState::Uninit => next == MqttState::Init,
            MqttState::Init => all_init_mask().iter().all(|f| self.flags.contains(f)),
            MqttState::Connecting => self.latched.connected,
            MqttState::Connected => true,
            MqttState::Subscribing => self.subscriptions.all_acknowledged(),
            MqttState::Disconnecting => true,
            MqttState::Disconnected => true,
            MqttState::Fault | MqttState::Invalid => false,
        }
    }

    fn enter_state(&mut self, next: MqttState, now_ms: u64) -> FsmResult<()> {
        debug!(
            "mqtt: {} -> {}",
            rustyfarian_network_pure::EnumLabel::label(&self.fsm.current()),
            rustyfarian_network_pure::EnumLabel::label(&next)
        );
        match next {
            MqttState::Init => self.enter_init(),
            MqttState::Connecting => self.enter_connecting(),
            MqttState::Connected => self.enter_connected(),
            MqttState::Subscribing => Ok(()),
            MqttState::Disconnecting => self.enter_disconnecting(),
            MqttState::Disconnected => self.enter_disconnected(now_ms),
            MqttState::Uninit | MqttState::Fault | MqttState::Invalid => Ok(()),
        }
    }

    /// `esp-idf-svc`'s client ties event-loop registration to construction,
    /// so there is nothing separable to stage ahead of `Connecting`; this
    /// waypoint only confirms a broker definition is present.
    fn enter_init(&mut self) -> FsmResult<()> {
        if self.broker.is_none() {
            return Err(FsmError::NotReady);
        }
        self.flags |= MqttFlag::EspMqttInit | MqttFlag::EventLoopCreated | MqttFlag::EventRegistered;
        Ok(())
    }

    fn enter_connecting(&mut self) -> FsmResult<()> {
        if !self.radio_gate_open() {
            return Err(FsmError::RadioDown);
        }
        let broker = self.broker.clone().ok_or(FsmError::NotReady)?;
        let (client, connection) =
            build_client(&broker).map_err(|_| FsmError::HardwareOrLibrary)?;
        self.spawn_drain_thread(connection);
        self.client = Some(client);
        Ok(())
    }

    fn enter_connected(&mut self) -> FsmResult<()> {
        self.backoff.reset();
        self.replay_subscriptions();
        Ok(())
    }

    /// Must not run on the event-handler stack frame; `poll()` always runs
    /// on the driver thread, so this is safe.
    fn enter_disconnecting(&mut self) -> FsmResult<()> {
        self.client = None;
        Ok(())
    }

    fn enter_disconnected(&mut self, now_ms: u64) -> FsmResult<()> {
        self.mailboxes.connected.set(false);
        self.mailboxes.disconnected.set(false);
        if self.flags.contains(MqttFlag::Autoconnect) {
            let wait = self.backoff.fail();
            self.next_retry = Some(Deadline::after(now_ms, wait));
            info!("mqtt: scheduling reconnect in {wait} ms");
        }
        Ok(())
    }

    /// Iterates the subscription set in insertion order and resubmits every
    /// inactive entry. Activation waits for the matching SUBACK.
    fn replay_subscriptions(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        for sub in self.subscriptions.iter_mut() {
            if sub.active {
                continue;
            }
            match client.subscribe(sub.topic_pattern.as_str(), to_esp_qos(sub.qos)) {
                Ok(id) => sub.pending_msg_id = id as i32,
                Err(err) => warn!("mqtt: resubscribe to {} failed: {err}", sub.topic_pattern),
            }
        }
    }

    fn dispatch_inbox(&mut self) {
        for msg in self.mailboxes.take_inbox() {
            for sub in self.subscriptions.iter() {
                if topic_matches(sub.topic_pattern.as_str(), msg.topic.as_str()) {
                    if let Some(cb) = sub.callback {
                        let _ = cb(&msg);
                    }
                }
            }
        }
    }

    fn spawn_drain_thread(&mut self, mut connection: EspMqttConnection) {
        let mailboxes = Arc::clone(&self.mailboxes);
        let handle = thread::Builder::new()
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    match event.payload() {
                        EventPayload::Connected(_session_present) => mailboxes.connected.set(true),
                        EventPayload::Disconnected => mailboxes.disconnected.set(true),
                        EventPayload::Subscribed(id) => mailboxes.suback_msg_id.set(id as i32),
                        EventPayload::Unsubscribed(id) => mailboxes.unsuback_msg_id.set(id as i32),
                        EventPayload::Published(_) => {}
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            details,
                            ..
                        } => {
                            let total = match details {
                                Details::Complete => data.len(),
                                Details::InitialChunk(chunk) => chunk.total_data_size,
                                Details::SubsequentChunk(chunk) => chunk.total_data_size,
                            };
                            mailboxes.on_data_fragment(topic, data, total, 0);
                        }
                        EventPayload::Error(err) => {
                            warn!("mqtt: transport error: {err:?}");
                            mailboxes.transport_error.set(true);
                        }
                        _ => {}
                    }
                }
            })
            .expect("spawning the mqtt event drain thread");
        self._drain_thread = Some(handle);
    }
}

fn to_esp_qos(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

fn build_client(def: &MqttBrokerDef) -> AnyResult<(EspMqttClient<'static>, EspMqttConnection)> {
    let lwt = def.lwt.as_ref().map(|lwt| LwtConfiguration {
        topic: lwt.topic.as_str(),
        payload: lwt.message.as_bytes(),
        qos: to_esp_qos(lwt.qos),
        retain: lwt.retain,
    });
    let conf = MqttClientConfiguration {
        protocol_version: match def.protocol_version {
            ProtocolVersion::V3_1 => Some(MqttProtocolVersion::V3_1),
            ProtocolVersion::V3_1_1 => Some(MqttProtocolVersion::V3_1_1),
        },
        username: (!def.username.is_empty()).then_some(def.username.as_str()),
        password: (!def.password.is_empty()).then_some(def.password.as_str()),
        lwt,
        disable_clean_session: false,
        ..Default::default()
    };
    EspMqttClient::new(def.uri.as_str(), &conf).context("constructing EspMqttClient")
}

/// Single-level (`+`) and multi-level (`#`, trailing only) MQTT topic-filter
/// matching against a concrete published topic.
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(fs), Some(ts)) if fs == ts => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_matching_handles_wildcards() {
        assert!(topic_matches("telemetry/#", "telemetry/sensor1/temp"));
        assert!(topic_matches("cmd/+", "cmd/restart"));
        assert!(!topic_matches("cmd/+", "cmd/restart/now"));
        assert!(topic_matches("a/b/c", "a/b/c"));
        assert!(!topic_matches("a/b/c", "a/b"));
    }
}
