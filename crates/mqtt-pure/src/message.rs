use heapless::{String, Vec};

pub const TOPIC_MAX: usize = 128;
pub const PAYLOAD_MAX: usize = 512;

/// A single MQTT publish, in either direction.
///
/// `msg_id < 0` denotes "unassigned" (not yet submitted to the broker, or a
/// QoS 0 message that never gets one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String<TOPIC_MAX>,
    pub payload: Vec<u8, PAYLOAD_MAX>,
    pub qos: u8,
    pub retain: bool,
    pub dup: bool,
    pub msg_id: i32,
}

impl MqttMessage {
    pub const UNASSIGNED: i32 = -1;

    pub fn new(topic: &str, payload: &[u8], qos: u8, retain: bool) -> Option<Self> {
        let mut t = String::new();
        t.push_str(topic).ok()?;
        let mut p = Vec::new();
        p.extend_from_slice(payload).ok()?;
        Some(Self {
            topic: t,
            payload: p,
            qos: qos.min(2),
            retain,
            dup: false,
            msg_id: Self::UNASSIGNED,
        })
    }
}
