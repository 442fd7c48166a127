/// The radio dependency the MQTT FSM gates its `Connecting` entry on.
///
/// `rustyfarian-esp-idf-mqtt` is deliberately generic over this trait rather
/// than depending on `rustyfarian-esp-idf-wifi` directly, the way the
/// source's MQTT driver only reads the radio's already-latched status
/// instead of reaching into its FSM internals.
pub trait RadioGate {
    /// True once the station has associated (may not yet have an IP).
    fn link_up(&self) -> bool;
    /// True once DHCP (or static config) has produced an address.
    fn has_ip(&self) -> bool;
    /// The current IPv4 address in native byte order, or `0` if none.
    fn ip4(&self) -> u32;

    /// The conjunction MQTT `Connecting` requires.
    fn gate_open(&self) -> bool {
        self.link_up() && self.has_ip()
    }
}
