//! The MQTT client's mailbox set, plus the DATA-event reassembly buffer the
//! event loop thread writes into and `poll()` drains.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use mqtt_pure::MqttMessage;
use rustyfarian_network_pure::mailbox::{MailboxBool, MailboxMsgId};

/// Written only by the `EspMqttConnection` drain thread; read only by
/// [`crate::client::MqttClient::poll`].
#[derive(Default)]
pub struct MqttMailboxes {
    pub connected: MailboxBool,
    pub disconnected: MailboxBool,
    pub suback_msg_id: MailboxMsgId,
    pub unsuback_msg_id: MailboxMsgId,
    pub transport_error: MailboxBool,
    reassembly: Mutex<HashMap<String, Vec<u8>>>,
    inbox: Mutex<VecDeque<MqttMessage>>,
}

impl MqttMailboxes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a DATA fragment to the topic's reassembly buffer. When
    /// `total_len` bytes have accumulated the fragment set is drained into
    /// a completed [`MqttMessage`] on the inbox queue.
    pub fn on_data_fragment(&self, topic: &str, data: &[u8], total_len: usize, qos: u8) {
        let mut reassembly = self.reassembly.lock().unwrap();
        let buf = reassembly.entry(topic.to_string()).or_default();
        buf.extend_from_slice(data);
        if buf.len() >= total_len {
            if let Some(msg) = MqttMessage::new(topic, buf, qos, false) {
                self.inbox.lock().unwrap().push_back(msg);
            }
            reassembly.remove(topic);
        }
    }

    pub fn take_inbox(&self) -> Vec<MqttMessage> {
        let mut inbox = self.inbox.lock().unwrap();
        inbox.drain(..).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchedMqttState {
    pub connected: bool,
    pub disconnected: bool,
    pub suback_msg_id: Option<i32>,
    pub unsuback_msg_id: Option<i32>,
    pub transport_error: bool,
}

impl MqttMailboxes {
    pub fn latch(&self) -> LatchedMqttState {
        LatchedMqttState {
            connected: self.connected.get(),
            disconnected: self.disconnected.get(),
            suback_msg_id: self.suback_msg_id.take(),
            unsuback_msg_id: self.unsuback_msg_id.take(),
            transport_error: self.transport_error.get(),
        }
    }
}
