/// Verdict returned by a cooperative `poll()` call so a super-loop can sleep
/// when every owned FSM reports no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    /// The FSM performed a transition or an entry-action this tick.
    Action,
    /// The FSM observed nothing new; safe to skip a wakeup.
    NoAction,
}

impl PollVerdict {
    pub fn is_action(self) -> bool {
        matches!(self, PollVerdict::Action)
    }

    /// Combine two verdicts: `Action` if either reports `Action`.
    pub fn or(self, other: PollVerdict) -> PollVerdict {
        if self.is_action() || other.is_action() {
            PollVerdict::Action
        } else {
            PollVerdict::NoAction
        }
    }
}
