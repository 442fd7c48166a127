use heapless::String;
use rustyfarian_network_pure::{FsmError, FsmResult};

pub const SSID_MAX: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Unknown,
}

impl AuthMode {
    fn tag(self) -> u8 {
        match self {
            AuthMode::Open => 0,
            AuthMode::Wep => 1,
            AuthMode::WpaPsk => 2,
            AuthMode::Wpa2Psk => 3,
            AuthMode::WpaWpa2Psk => 4,
            AuthMode::Wpa2Enterprise => 5,
            AuthMode::Wpa3Psk => 6,
            AuthMode::Unknown => 7,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => AuthMode::Open,
            1 => AuthMode::Wep,
            2 => AuthMode::WpaPsk,
            3 => AuthMode::Wpa2Psk,
            4 => AuthMode::WpaWpa2Psk,
            5 => AuthMode::Wpa2Enterprise,
            6 => AuthMode::Wpa3Psk,
            _ => AuthMode::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherType {
    None,
    Wep40,
    Wep104,
    Tkip,
    Ccmp,
    TkipCcmp,
    Unknown,
}

impl CipherType {
    fn tag(self) -> u8 {
        match self {
            CipherType::None => 0,
            CipherType::Wep40 => 1,
            CipherType::Wep104 => 2,
            CipherType::Tkip => 3,
            CipherType::Ccmp => 4,
            CipherType::TkipCcmp => 5,
            CipherType::Unknown => 6,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => CipherType::None,
            1 => CipherType::Wep40,
            2 => CipherType::Wep104,
            3 => CipherType::Tkip,
            4 => CipherType::Ccmp,
            5 => CipherType::TkipCcmp,
            _ => CipherType::Unknown,
        }
    }
}

/// A single scanned access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointRecord {
    pub ssid: String<SSID_MAX>,
    /// Signal strength in dBm (negative, e.g. -62).
    pub rssi: i8,
    pub primary_channel: u8,
    pub auth_mode: AuthMode,
    pub pairwise_cipher: CipherType,
    pub group_cipher: CipherType,
}

impl AccessPointRecord {
    pub fn new(ssid: &str, rssi: i8, primary_channel: u8, auth_mode: AuthMode) -> Self {
        let mut s = String::new();
        // Truncate rather than fail; SSIDs are already bounded to 32 bytes
        // on the air, this only guards against a malformed caller.
        let _ = s.push_str(&ssid[..ssid.len().min(SSID_MAX)]);
        Self {
            ssid: s,
            rssi,
            primary_channel,
            auth_mode,
            pairwise_cipher: CipherType::Unknown,
            group_cipher: CipherType::Unknown,
        }
    }

    /// Minimal self-describing binary encoding used by
    /// [`crate::scan::ScanResultTable`]'s `serialize_ap` contract. Field
    /// order: ssid-len, ssid bytes, rssi, channel, auth tag, pairwise tag,
    /// group tag. Wire-format negotiation (CBOR or otherwise) is a pluggable
    /// concern above this core; this is the default.
    pub fn encode(&self, buf: &mut [u8]) -> FsmResult<usize> {
        let needed = 1 + self.ssid.len() + 1 + 1 + 1 + 1 + 1;
        if buf.len() < needed {
            return Err(FsmError::BadParameter);
        }
        let mut i = 0;
        buf[i] = self.ssid.len() as u8;
        i += 1;
        buf[i..i + self.ssid.len()].copy_from_slice(self.ssid.as_bytes());
        i += self.ssid.len();
        buf[i] = self.rssi as u8;
        i += 1;
        buf[i] = self.primary_channel;
        i += 1;
        buf[i] = self.auth_mode.tag();
        i += 1;
        buf[i] = self.pairwise_cipher.tag();
        i += 1;
        buf[i] = self.group_cipher.tag();
        i += 1;
        Ok(i)
    }

    pub fn decode(buf: &[u8]) -> FsmResult<(Self, usize)> {
        if buf.is_empty() {
            return Err(FsmError::BadParameter);
        }
        let ssid_len = buf[0] as usize;
        let needed = 1 + ssid_len + 5;
        if buf.len() < needed || ssid_len > SSID_MAX {
            return Err(FsmError::BadParameter);
        }
        let ssid_bytes = &buf[1..1 + ssid_len];
        let ssid_str = core::str::from_utf8(ssid_bytes).map_err(|_| FsmError::BadParameter)?;
        let mut ssid = String::new();
        ssid.push_str(ssid_str).map_err(|_| FsmError::BadParameter)?;
        let mut i = 1 + ssid_len;
        let rssi = buf[i] as i8;
        i += 1;
        let primary_channel = buf[i];
        i += 1;
        let auth_mode = AuthMode::from_tag(buf[i]);
        i += 1;
        let pairwise_cipher = CipherType::from_tag(buf[i]);
        i += 1;
        let group_cipher = CipherType::from_tag(buf[i]);
        i += 1;
        Ok((
            Self {
                ssid,
                rssi,
                primary_channel,
                auth_mode,
                pairwise_cipher,
                group_cipher,
            },
            i,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let mut ap = AccessPointRecord::new("café-wifi", -62, 6, AuthMode::Wpa2Psk);
        ap.pairwise_cipher = CipherType::Ccmp;
        ap.group_cipher = CipherType::Tkip;

        let mut buf = [0u8; 64];
        let n = ap.encode(&mut buf).unwrap();
        let (decoded, consumed) = AccessPointRecord::decode(&buf[..n]).unwrap();
        assert_eq!(consumed, n);
        assert_eq!(decoded, ap);
    }

    #[test]
    fn encode_rejects_undersized_buffer() {
        let ap = AccessPointRecord::new("net", -40, 1, AuthMode::Open);
        let mut tiny = [0u8; 2];
        assert_eq!(ap.encode(&mut tiny), Err(FsmError::BadParameter));
    }
}
