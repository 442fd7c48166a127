use enumset::{EnumSet, EnumSetType};

/// Individual radio flags. Stored packed in an [`EnumSet`], the way the
/// source keeps a single `uint32_t` of bits.
#[derive(EnumSetType, Debug)]
pub enum RadioFlag {
    NetifInit,
    EventLoopCreated,
    WifiInit,
    WifiStarted,
    InitAsStation,
    InitAsAp,
    InitAsMesh,
    Autoconnect,
    AuthRefused,
    ConnectActive,
}

pub type RadioFlags = EnumSet<RadioFlag>;

/// `NETIF_INIT | EVENT_LOOP_CREATED`.
pub fn preinit_mask() -> RadioFlags {
    RadioFlag::NetifInit | RadioFlag::EventLoopCreated
}

/// `PREINIT | WIFI_INIT | WIFI_STARTED`.
pub fn all_init_mask() -> RadioFlags {
    preinit_mask() | RadioFlag::WifiInit | RadioFlag::WifiStarted
}

/// Flags a radio reset preserves: `CONNECT_ACTIVE | AUTH_REFUSED | PREINIT`.
pub fn reset_preserve_mask() -> RadioFlags {
    preinit_mask() | RadioFlag::ConnectActive | RadioFlag::AuthRefused
}

/// Exactly one of `INIT_AS_STATION | INIT_AS_AP | INIT_AS_MESH` is set.
pub fn exactly_one_init_mode(flags: RadioFlags) -> bool {
    let mode_bits = flags
        & (RadioFlag::InitAsStation | RadioFlag::InitAsAp | RadioFlag::InitAsMesh);
    mode_bits.len() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_preserves_expected_bits() {
        let mut flags: RadioFlags = RadioFlag::NetifInit
            | RadioFlag::EventLoopCreated
            | RadioFlag::WifiInit
            | RadioFlag::WifiStarted
            | RadioFlag::ConnectActive
            | RadioFlag::AuthRefused;
        flags &= reset_preserve_mask();
        assert!(flags.contains(RadioFlag::NetifInit));
        assert!(flags.contains(RadioFlag::EventLoopCreated));
        assert!(flags.contains(RadioFlag::ConnectActive));
        assert!(flags.contains(RadioFlag::AuthRefused));
        assert!(!flags.contains(RadioFlag::WifiInit));
        assert!(!flags.contains(RadioFlag::WifiStarted));
    }

    #[test]
    fn exactly_one_mode_check() {
        let none: RadioFlags = EnumSet::new();
        assert!(!exactly_one_init_mode(none));
        assert!(exactly_one_init_mode(EnumSet::only(RadioFlag::InitAsStation)));
        let both = RadioFlag::InitAsStation | RadioFlag::InitAsAp;
        assert!(!exactly_one_init_mode(both));
    }
}
