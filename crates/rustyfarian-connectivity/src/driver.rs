//! Couples the Wi-Fi radio FSM and the MQTT client FSM behind one
//! `poll()`, wiring the MQTT FSM's radio gate to the radio's mailboxes.

use std::sync::Arc;

use rustyfarian_esp_idf_mqtt::MqttClient;
use rustyfarian_esp_idf_wifi::{Radio, RadioGateHandle};
use rustyfarian_network_pure::PollVerdict;

pub struct Driver {
    radio: Radio,
    mqtt: MqttClient,
}

impl Driver {
    pub fn new(radio: Radio, mut mqtt: MqttClient) -> Self {
        mqtt.set_radio(Arc::new(RadioGateHandle::new(radio.mailboxes())));
        Self { radio, mqtt }
    }

    pub fn radio(&self) -> &Radio {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut Radio {
        &mut self.radio
    }

    pub fn mqtt(&self) -> &MqttClient {
        &self.mqtt
    }

    pub fn mqtt_mut(&mut self) -> &mut MqttClient {
        &mut self.mqtt
    }

    /// Advances both FSMs exactly once each. A super-loop may sleep when
    /// this returns `NoAction`.
    pub fn poll(&mut self, now_ms: u64) -> PollVerdict {
        let radio_verdict = self.radio.poll(now_ms);
        let mqtt_verdict = self.mqtt.poll(now_ms);
        radio_verdict.or(mqtt_verdict)
    }
}
