use core::fmt;

/// Error taxonomy shared by every FSM in this workspace.
///
/// Entry-action failures never advance an FSM; these are returned to the
/// caller immediately and do not enqueue retries (the FSM-internal waypoint
/// queue is the only retry mechanism).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmError {
    /// Operation attempted before `init()`, or during a transitional state
    /// that forbids it.
    NotReady,
    /// Invalid arguments: unknown state, oversized buffer, malformed string.
    BadParameter,
    /// The waypoint queue cannot accept a new route (full, or waiting out a
    /// dwell timer).
    Busy,
    /// An MQTT operation that requires `Connected` was attempted elsewhere.
    NotConnected,
    /// MQTT `Connecting` entry declined because the radio gate is closed.
    RadioDown,
    /// The underlying library call failed; the owning FSM has routed to
    /// `Fault`.
    HardwareOrLibrary,
    /// A disconnect reason code indicated authentication failure. Sticky:
    /// cleared only by the application.
    AuthRefused,
}

impl fmt::Display for FsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsmError::NotReady => "not ready",
            FsmError::BadParameter => "bad parameter",
            FsmError::Busy => "fsm busy",
            FsmError::NotConnected => "not connected",
            FsmError::RadioDown => "radio gate closed",
            FsmError::HardwareOrLibrary => "underlying library error",
            FsmError::AuthRefused => "authentication refused",
        };
        f.write_str(msg)
    }
}

pub type FsmResult<T> = Result<T, FsmError>;
