//! MQTT client FSM for ESP-IDF, gated on a
//! [`rustyfarian_network_pure::RadioGate`] implementation, with subscription
//! replay on reconnect.

pub mod client;
pub mod mailbox;

pub use client::MqttClient;
pub use mailbox::{LatchedMqttState, MqttMailboxes};
