//! Platform-independent Wi-Fi types: the radio's state and flag enums,
//! access-point records, and the fixed-capacity scan table. No ESP-IDF
//! dependency lives here; `rustyfarian-esp-idf-wifi` drives these types
//! against the real driver.
#![cfg_attr(not(test), no_std)]

pub mod ap;
pub mod flags;
pub mod reason;
pub mod scan;
pub mod state;

pub use ap::{AccessPointRecord, AuthMode, CipherType};
pub use flags::{all_init_mask, exactly_one_init_mode, preinit_mask, reset_preserve_mask};
pub use flags::{RadioFlag, RadioFlags};
pub use scan::ScanResultTable;
pub use state::RadioState;
