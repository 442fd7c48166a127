//! Wi-Fi station radio FSM for ESP-IDF. Couples [`wifi_pure`]'s types and
//! [`rustyfarian_network_pure`]'s waypoint core to the real `esp-idf-svc`
//! driver behind a cooperative `poll()`.

pub mod mailbox;
pub mod radio;

pub use mailbox::{LatchedRadioState, RadioMailboxes};
pub use radio::{Radio, RadioGateHandle};
