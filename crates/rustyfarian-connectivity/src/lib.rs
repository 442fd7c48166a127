//! Combines the Wi-Fi radio FSM and MQTT client FSM into a single super-loop
//! driver plus a console command bridge for operator use.

pub mod console;
pub mod driver;

pub use console::{dispatch, ConsoleError};
pub use driver::Driver;
