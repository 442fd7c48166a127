//! Platform-independent FSM machinery shared by the Wi-Fi radio driver and
//! the MQTT client driver: waypoint-queue FSM core, mailbox discipline,
//! backoff timers, and the error taxonomy both FSMs return.
#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod gate;
pub mod label;
pub mod mailbox;
pub mod poll;
pub mod timer;
pub mod waypoint;

pub use error::{FsmError, FsmResult};
pub use gate::RadioGate;
pub use label::EnumLabel;
pub use poll::PollVerdict;
pub use timer::{Backoff, Deadline};
pub use waypoint::Fsm;
