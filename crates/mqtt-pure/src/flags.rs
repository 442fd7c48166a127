use enumset::{EnumSet, EnumSetType};

#[derive(EnumSetType, Debug)]
pub enum MqttFlag {
    EspMqttInit,
    EventLoopCreated,
    EventRegistered,
    Autoconnect,
    SubsComplete,
}

pub type MqttFlags = EnumSet<MqttFlag>;

/// `ESP_MQTT_INIT | EVENT_LOOP_CREATED | EVENT_REGISTERED`.
pub fn all_init_mask() -> MqttFlags {
    MqttFlag::EspMqttInit | MqttFlag::EventLoopCreated | MqttFlag::EventRegistered
}
