use crate::message::{MqttMessage, TOPIC_MAX};
use heapless::{String, Vec};
use rustyfarian_network_pure::{FsmError, FsmResult};

pub const SUBSCRIPTION_SET_CAPACITY: usize = 8;
pub const REPLY_TOPIC_MAX: usize = 64;

/// Callback invoked with an inbound message matching a subscription's topic
/// pattern. The returned topic is a reserved extension point (e.g. a
/// request/reply hook); this core does not act on it itself.
pub type TopicCallback = fn(&MqttMessage) -> Option<String<REPLY_TOPIC_MAX>>;

#[derive(Clone, Copy)]
pub struct MqttSubscription {
    pub topic_pattern: String<TOPIC_MAX>,
    pub qos: u8,
    pub callback: Option<TopicCallback>,
    /// Set when a SUBSCRIBE is submitted; cleared on SUBACK.
    pub pending_msg_id: i32,
    /// A subscription is active only once its SUBACK has arrived.
    pub active: bool,
}

impl MqttSubscription {
    pub fn new(topic_pattern: &str, qos: u8, callback: Option<TopicCallback>) -> FsmResult<Self> {
        let mut t = String::new();
        t.push_str(topic_pattern).map_err(|_| FsmError::BadParameter)?;
        Ok(Self {
            topic_pattern: t,
            qos: qos.min(2),
            callback,
            pending_msg_id: -1,
            active: false,
        })
    }
}

/// Ordered subscription set, insertion order preserved so a reconnect
/// replays SUBSCRIBEs in the order the application originally issued them.
#[derive(Default)]
pub struct SubscriptionSet {
    entries: Vec<MqttSubscription, SUBSCRIPTION_SET_CAPACITY>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert or update a subscription by topic pattern. Updating an
    /// existing entry preserves its position (no reordering on edit).
    pub fn upsert(
        &mut self,
        topic_pattern: &str,
        qos: u8,
        callback: Option<TopicCallback>,
    ) -> FsmResult<()> {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|s| s.topic_pattern == topic_pattern)
        {
            existing.qos = qos.min(2);
            existing.callback = callback;
            return Ok(());
        }
        let sub = MqttSubscription::new(topic_pattern, qos, callback)?;
        self.entries.push(sub).map_err(|_| FsmError::Busy)
    }

    pub fn remove(&mut self, topic_pattern: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.topic_pattern != topic_pattern);
        self.entries.len() != before
    }

    pub fn iter(&self) -> core::slice::Iter<'_, MqttSubscription> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, MqttSubscription> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that `topic_pattern`'s SUBSCRIBE was submitted with
    /// `msg_id`, awaiting SUBACK.
    pub fn mark_pending(&mut self, topic_pattern: &str, msg_id: i32) {
        if let Some(s) = self
            .entries
            .iter_mut()
            .find(|s| s.topic_pattern == topic_pattern)
        {
            s.pending_msg_id = msg_id;
        }
    }

    /// Acknowledges a SUBACK by message id, activating the matching
    /// subscription. Returns true if a match was found.
    pub fn acknowledge(&mut self, msg_id: i32) -> bool {
        if let Some(s) = self.entries.iter_mut().find(|s| s.pending_msg_id == msg_id) {
            s.active = true;
            s.pending_msg_id = -1;
            true
        } else {
            false
        }
    }

    pub fn all_acknowledged(&self) -> bool {
        self.entries.iter().all(|s| s.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut set = SubscriptionSet::new();
        set.upsert("telemetry/#", 1, None).unwrap();
        set.upsert("cmd/+", 0, None).unwrap();
        let patterns: heapless::Vec<&str, 4> =
            set.iter().map(|s| s.topic_pattern.as_str()).collect();
        assert_eq!(patterns.as_slice(), ["telemetry/#", "cmd/+"]);
    }

    #[test]
    fn ack_activates_only_matching_pending() {
        let mut set = SubscriptionSet::new();
        set.upsert("a", 1, None).unwrap();
        set.upsert("b", 1, None).unwrap();
        set.mark_pending("a", 10);
        set.mark_pending("b", 11);
        assert!(!set.all_acknowledged());
        assert!(set.acknowledge(10));
        assert!(!set.all_acknowledged());
        assert!(set.acknowledge(11));
        assert!(set.all_acknowledged());
    }

    #[test]
    fn upsert_updates_qos_without_reordering() {
        let mut set = SubscriptionSet::new();
        set.upsert("a", 0, None).unwrap();
        set.upsert("b", 0, None).unwrap();
        set.upsert("a", 2, None).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().unwrap().topic_pattern.as_str(), "a");
        assert_eq!(set.iter().next().unwrap().qos, 2);
    }
}
