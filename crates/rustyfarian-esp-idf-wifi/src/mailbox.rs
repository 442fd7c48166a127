//! The radio's mailbox set and the driver-thread snapshot copied from it on
//! each `poll()` entry.

use rustyfarian_network_pure::mailbox::{EdgeLatch, MailboxBool, MailboxU16, MailboxU32};

/// Written only by Wi-Fi/IP event handlers running on the system event-loop
/// thread; read only by [`crate::radio::Radio::poll`].
#[derive(Default)]
pub struct RadioMailboxes {
    pub wifi_started: MailboxBool,
    pub sta_connected: MailboxBool,
    pub ip4_valid: MailboxBool,
    pub scan_done: EdgeLatch,
    pub ip4_addr: MailboxU32,
    pub disc_reason: MailboxU16,
}

impl RadioMailboxes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event-handler side: `WIFI_STA_DISCONNECTED`.
    pub fn on_disconnected(&self, reason: u16) {
        self.sta_connected.set(false);
        self.ip4_valid.set(false);
        self.ip4_addr.set(0);
        self.disc_reason.set(reason);
    }

    /// Event-handler side: `IP_STA_LOST_IP`.
    pub fn on_lost_ip(&self) {
        self.ip4_valid.set(false);
        self.ip4_addr.set(0);
    }
}

/// Driver-thread-owned snapshot copied from the mailboxes atomically at the
/// top of each `poll()` tick. FSM logic reads only this, never the mailboxes
/// directly, so a single tick sees a consistent view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchedRadioState {
    pub wifi_started: bool,
    pub sta_connected: bool,
    pub ip4_valid: bool,
    pub ip4_addr: u32,
    pub scan_done_latched: bool,
    pub last_disc_reason: u16,
}

impl RadioMailboxes {
    /// Copy every mailbox into a latch. `scan_done` is read (not cleared)
    /// here; only the FSM's `Scanning` exit clears it, via `consume_scan_done`.
    pub fn latch(&self) -> LatchedRadioState {
        LatchedRadioState {
            wifi_started: self.wifi_started.get(),
            sta_connected: self.sta_connected.get(),
            ip4_valid: self.ip4_valid.get(),
            ip4_addr: self.ip4_addr.get(),
            scan_done_latched: self.scan_done.is_set(),
            last_disc_reason: self.disc_reason.get(),
        }
    }

    /// Called only by the FSM when leaving `Scanning`.
    pub fn consume_scan_done(&self) -> bool {
        self.scan_done.take()
    }
}
