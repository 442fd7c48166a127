use rustyfarian_network_pure::EnumLabel;

/// The MQTT client's lifecycle states, layered on top of the radio's link
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttState {
    Uninit,
    Init,
    Connecting,
    Connected,
    Subscribing,
    Disconnecting,
    Disconnected,
    Fault,
    Invalid,
}

impl EnumLabel for MqttState {
    fn label(&self) -> &'static str {
        match self {
            MqttState::Uninit => "UNINIT",
            MqttState::Init => "INIT",
            MqttState::Connecting => "CONNECTING",
            MqttState::Connected => "CONNECTED",
            MqttState::Subscribing => "SUBSCRIBING",
            MqttState::Disconnecting => "DISCONNECTING",
            MqttState::Disconnected => "DISCONNECTED",
            MqttState::Fault => "FAULT",
            MqttState::Invalid => "INVALID",
        }
    }
}
