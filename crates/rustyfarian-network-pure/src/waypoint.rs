//! The generic FSM core: a current state plus a bounded queue of planned
//! next states (the "itinerary"). Owners decompose each transition into an
//! exit-check (pure) and an entry-action (fallible); this module only ever
//! manages the queue and the current-state bookkeeping, never the
//! entry-actions themselves.

use crate::error::{FsmError, FsmResult};
use crate::timer::Deadline;
use heapless::Deque;

/// A bounded FIFO of planned states plus the FSM's current position.
///
/// `N` is the waypoint capacity (spec default: 8-12). The queue represents
/// the itinerary; the current state is tracked separately and is never
/// itself a member of the queue.
pub struct Fsm<S, const N: usize>
where
    S: Copy + PartialEq,
{
    current: S,
    previous: Option<S>,
    queue: Deque<S, N>,
    dwell_until: Option<Deadline>,
}

impl<S, const N: usize> Fsm<S, N>
where
    S: Copy + PartialEq,
{
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            previous: None,
            queue: Deque::new(),
            dwell_until: None,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn previous(&self) -> Option<S> {
        self.previous
    }

    /// Queue is empty: no planned transitions.
    pub fn is_stable(&self) -> bool {
        self.queue.is_empty()
    }

    /// Stable, and the minimum dwell time after the last transition has not
    /// yet elapsed.
    pub fn is_waiting(&self, now_ms: u64) -> bool {
        self.is_stable()
            && self
                .dwell_until
                .map(|d| !d.is_due(now_ms))
                .unwrap_or(false)
    }

    pub fn peek_next(&self) -> Option<S> {
        self.queue.front().copied()
    }

    pub fn is_next_pos(&self, s: S) -> bool {
        self.peek_next() == Some(s)
    }

    /// Replace the queue wholesale. Fails without mutating state if `states`
    /// would overflow the capacity.
    pub fn set_route(&mut self, states: &[S]) -> FsmResult<()> {
        if states.len() > N {
            return Err(FsmError::BadParameter);
        }
        let mut fresh = Deque::new();
        for s in states {
            // Capacity was checked above; this cannot fail.
            let _ = fresh.push_back(*s);
        }
        self.queue = fresh;
        Ok(())
    }

    pub fn append_route(&mut self, states: &[S]) -> FsmResult<()> {
        if self.queue.len() + states.len() > N {
            return Err(FsmError::Busy);
        }
        for s in states {
            let _ = self.queue.push_back(*s);
        }
        Ok(())
    }

    pub fn append_state(&mut self, s: S) -> FsmResult<()> {
        self.queue.push_back(s).map_err(|_| FsmError::Busy)
    }

    pub fn prepend_state(&mut self, s: S) -> FsmResult<()> {
        self.queue.push_front(s).map_err(|_| FsmError::Busy)
    }

    /// Force the current state, discarding the queue. Used to route into
    /// `Fault` unconditionally.
    pub fn mark_current_state(&mut self, s: S) {
        self.previous = Some(self.current);
        self.current = s;
        self.queue = Deque::new();
        self.dwell_until = None;
    }

    /// Called by the owner once its `set_position(head)` entry-action has
    /// already returned success for `peek_next()`. Pops the head, makes it
    /// current, and records the prior state. `min_dwell_ms` arms the
    /// post-transition dwell timer (0 disables it).
    ///
    /// Returns the new current state, or `None` if the queue was empty (the
    /// owner should not have called this).
    pub fn advance(&mut self, now_ms: u64, min_dwell_ms: u64) -> Option<S> {
        let next = self.queue.pop_front()?;
        self.previous = Some(self.current);
        self.current = next;
        self.dwell_until = if min_dwell_ms > 0 {
            Some(Deadline::after(now_ms, min_dwell_ms))
        } else {
            None
        };
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    enum S {
        A,
        B,
        C,
    }

    #[test]
    fn set_route_replaces_queue() {
        let mut fsm: Fsm<S, 4> = Fsm::new(S::A);
        fsm.set_route(&[S::B, S::C]).unwrap();
        assert_eq!(fsm.peek_next(), Some(S::B));
        assert!(!fsm.is_stable());
    }

    #[test]
    fn set_route_rejects_oversized() {
        let mut fsm: Fsm<S, 2> = Fsm::new(S::A);
        assert_eq!(
            fsm.set_route(&[S::A, S::B, S::C]),
            Err(FsmError::BadParameter)
        );
    }

    #[test]
    fn advance_pops_and_tracks_previous() {
        let mut fsm: Fsm<S, 4> = Fsm::new(S::A);
        fsm.set_route(&[S::B, S::C]).unwrap();
        let next = fsm.advance(0, 0);
        assert_eq!(next, Some(S::B));
        assert_eq!(fsm.current(), S::B);
        assert_eq!(fsm.previous(), Some(S::A));
        assert!(!fsm.is_stable());
        fsm.advance(0, 0);
        assert_eq!(fsm.current(), S::C);
        assert!(fsm.is_stable());
    }

    #[test]
    fn is_waiting_respects_dwell() {
        let mut fsm: Fsm<S, 4> = Fsm::new(S::A);
        fsm.set_route(&[S::B]).unwrap();
        fsm.advance(1_000, 200);
        assert!(fsm.is_waiting(1_100));
        assert!(!fsm.is_waiting(1_200));
    }

    #[test]
    fn prepend_is_busy_when_full() {
        let mut fsm: Fsm<S, 1> = Fsm::new(S::A);
        fsm.append_state(S::B).unwrap();
        assert_eq!(fsm.prepend_state(S::C), Err(FsmError::Busy));
    }

    #[test]
    fn mark_current_state_clears_queue() {
        let mut fsm: Fsm<S, 4> = Fsm::new(S::A);
        fsm.set_route(&[S::B, S::C]).unwrap();
        fsm.mark_current_state(S::C);
        assert_eq!(fsm.current(), S::C);
        assert!(fsm.is_stable());
    }
}
