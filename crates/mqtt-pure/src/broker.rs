use heapless::String;
use rustyfarian_network_pure::{FsmError, FsmResult};

pub const LABEL_MAX: usize = 32;
pub const URI_MAX: usize = 128;
pub const CRED_MAX: usize = 64;
pub const TOPIC_MAX: usize = 64;
pub const LWT_MESSAGE_MAX: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V3_1,
    V3_1_1,
}

impl ProtocolVersion {
    fn tag(self) -> u8 {
        match self {
            ProtocolVersion::V3_1 => 0,
            ProtocolVersion::V3_1_1 => 1,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ProtocolVersion::V3_1,
            _ => ProtocolVersion::V3_1_1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LwtConfig {
    pub topic: String<TOPIC_MAX>,
    pub message: String<LWT_MESSAGE_MAX>,
    pub qos: u8,
    pub retain: bool,
}

/// Broker connection definition. The label is metadata only; the rest is
/// handed to the underlying MQTT library verbatim at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttBrokerDef {
    pub label: String<LABEL_MAX>,
    pub uri: String<URI_MAX>,
    pub username: String<CRED_MAX>,
    pub password: String<CRED_MAX>,
    pub lwt: Option<LwtConfig>,
    pub protocol_version: ProtocolVersion,
    pub disable_auto_reconnect: bool,
}

impl MqttBrokerDef {
    pub fn new(label: &str, uri: &str) -> FsmResult<Self> {
        let mut l = String::new();
        l.push_str(label).map_err(|_| FsmError::BadParameter)?;
        let mut u = String::new();
        u.push_str(uri).map_err(|_| FsmError::BadParameter)?;
        Ok(Self {
            label: l,
            uri: u,
            username: String::new(),
            password: String::new(),
            lwt: None,
            protocol_version: ProtocolVersion::V3_1_1,
            disable_auto_reconnect: false,
        })
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> FsmResult<Self> {
        self.username = String::new();
        self.username
            .push_str(username)
            .map_err(|_| FsmError::BadParameter)?;
        self.password = String::new();
        self.password
            .push_str(password)
            .map_err(|_| FsmError::BadParameter)?;
        Ok(self)
    }

    /// Minimal self-describing binary encoding, mirroring
    /// [`crate::message`]'s tagged-field style. Field order: label, uri,
    /// username, password, lwt-present flag (+ topic/message/qos/retain when
    /// present), protocol-version tag, disable-auto-reconnect flag.
    pub fn encode(&self, buf: &mut [u8]) -> FsmResult<usize> {
        let mut i = 0;
        for field in [&self.label, &self.uri, &self.username, &self.password] {
            let len = field.len();
            if buf.len() < i + 1 + len {
                return Err(FsmError::BadParameter);
            }
            buf[i] = len as u8;
            i += 1;
            buf[i..i + len].copy_from_slice(field.as_bytes());
            i += len;
        }
        if buf.len() < i + 1 {
            return Err(FsmError::BadParameter);
        }
        match &self.lwt {
            None => {
                buf[i] = 0;
                i += 1;
            }
            Some(lwt) => {
                buf[i] = 1;
                i += 1;
                for field in [&lwt.topic, &lwt.message] {
                    let len = field.len();
                    if buf.len() < i + 1 + len {
                        return Err(FsmError::BadParameter);
                    }
                    buf[i] = len as u8;
                    i += 1;
                    buf[i..i + len].copy_from_slice(field.as_bytes());
                    i += len;
                }
                if buf.len() < i + 2 {
                    return Err(FsmError::BadParameter);
                }
                buf[i] = lwt.qos;
                i += 1;
                buf[i] = lwt.retain as u8;
                i += 1;
            }
        }
        if buf.len() < i + 2 {
            return Err(FsmError::BadParameter);
        }
        buf[i] = self.protocol_version.tag();
        i += 1;
        buf[i] = self.disable_auto_reconnect as u8;
        i += 1;
        Ok(i)
    }

    pub fn decode(buf: &[u8]) -> FsmResult<(Self, usize)> {
        let mut i = 0;
        let mut read_string = |cap: usize, i: &mut usize| -> FsmResult<heapless::String<128>> {
            if buf.len() <= *i {
                return Err(FsmError::BadParameter);
            }
            let len = buf[*i] as usize;
            *i += 1;
            if buf.len() < *i + len || len > cap {
                return Err(FsmError::BadParameter);
            }
            let s = core::str::from_utf8(&buf[*i..*i + len]).map_err(|_| FsmError::BadParameter)?;
            *i += len;
            let mut out = heapless::String::new();
            out.push_str(s).map_err(|_| FsmError::BadParameter)?;
            Ok(out)
        };

        let label_wide = read_string(LABEL_MAX, &mut i)?;
        let uri_wide = read_string(URI_MAX, &mut i)?;
        let username_wide = read_string(CRED_MAX, &mut i)?;
        let password_wide = read_string(CRED_MAX, &mut i)?;

        let mut label = String::<LABEL_MAX>::new();
        label.push_str(&label_wide).map_err(|_| FsmError::BadParameter)?;
        let mut uri = String::<URI_MAX>::new();
        uri.push_str(&uri_wide).map_err(|_| FsmError::BadParameter)?;
        let mut username = String::<CRED_MAX>::new();
        username.push_str(&username_wide).map_err(|_| FsmError::BadParameter)?;
        let mut password = String::<CRED_MAX>::new();
        password.push_str(&password_wide).map_err(|_| FsmError::BadParameter)?;

        if buf.len() <= i {
            return Err(FsmError::BadParameter);
        }
        let has_lwt = buf[i] != 0;
        i += 1;
        let lwt = if has_lwt {
            let topic_wide = read_string(TOPIC_MAX, &mut i)?;
            let message_wide = read_string(LWT_MESSAGE_MAX, &mut i)?;
            let mut topic = String::<TOPIC_MAX>::new();
            topic.push_str(&topic_wide).map_err(|_| FsmError::BadParameter)?;
            let mut message = String::<LWT_MESSAGE_MAX>::new();
            message
                .push_str(&message_wide)
                .map_err(|_| FsmError::BadParameter)?;
            if buf.len() < i + 2 {
                return Err(FsmError::BadParameter);
            }
            let qos = buf[i];
            i += 1;
            let retain = buf[i] != 0;
            i += 1;
            Some(LwtConfig {
                topic,
                message,
                qos,
                retain,
            })
        } else {
            None
        };

        if buf.len() < i + 2 {
            return Err(FsmError::BadParameter);
        }
        let protocol_version = ProtocolVersion::from_tag(buf[i]);
        i += 1;
        let disable_auto_reconnect = buf[i] != 0;
        i += 1;

        Ok((
            Self {
                label,
                uri,
                username,
                password,
                lwt,
                protocol_version,
                disable_auto_reconnect,
            },
            i,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_lwt() {
        let def = MqttBrokerDef::new("home", "mqtt://broker.local:1883")
            .unwrap()
            .with_credentials("dev", "hunter2")
            .unwrap();
        let mut buf = [0u8; 256];
        let n = def.encode(&mut buf).unwrap();
        let (decoded, consumed) = MqttBrokerDef::decode(&buf[..n]).unwrap();
        assert_eq!(consumed, n);
        assert_eq!(decoded, def);
    }

    #[test]
    fn round_trips_with_lwt() {
        let mut def = MqttBrokerDef::new("shop-floor", "mqtt://10.0.0.5:1883").unwrap();
        def.disable_auto_reconnect = true;
        def.protocol_version = ProtocolVersion::V3_1;
        let mut topic = String::new();
        topic.push_str("devices/shop-floor/status").unwrap();
        let mut message = String::new();
        message.push_str("offline").unwrap();
        def.lwt = Some(LwtConfig {
            topic,
            message,
            qos: 1,
            retain: true,
        });

        let mut buf = [0u8; 256];
        let n = def.encode(&mut buf).unwrap();
        let (decoded, _) = MqttBrokerDef::decode(&buf[..n]).unwrap();
        assert_eq!(decoded, def);
    }
}
