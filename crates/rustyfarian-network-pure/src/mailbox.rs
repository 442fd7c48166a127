//! Single-writer, single-reader mailboxes carrying data from an
//! asynchronous event-loop thread to the driver thread's `poll()`.
//!
//! Plain atomics stand in for the source's `volatile` flags. Ordinary
//! mailboxes use `Relaxed` on both ends — the only cross-field invariant
//! they need is "eventually visible", and the driver re-reads everything at
//! the top of each `poll()` tick regardless. The scan-done mailbox is the
//! one true edge: it is latched until the FSM consumes it on leaving
//! `Scanning`, so its writer uses `Release` and its reader/consumer uses
//! `Acquire`/`AcqRel` to make sure nothing written before the edge is
//! reordered past it.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, AtomicU32, Ordering};

/// A plain boolean mailbox: last-write-wins, `Relaxed` both ways.
#[derive(Debug, Default)]
pub struct MailboxBool(AtomicBool);

impl MailboxBool {
    pub const fn new(initial: bool) -> Self {
        Self(AtomicBool::new(initial))
    }

    pub fn set(&self, v: bool) {
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// An edge-triggered boolean mailbox. `set()` is the writer-side edge and
/// uses `Release`; `take()` consumes the edge with `AcqRel`, clearing it
/// back to `false` and returning whether it had been set.
#[derive(Debug, Default)]
pub struct EdgeLatch(AtomicBool);

impl EdgeLatch {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the latch; only the FSM, on leaving the gated state, may call
    /// this.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Read-and-clear in one step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Default)]
pub struct MailboxU32(AtomicU32);

impl MailboxU32 {
    pub const fn new(initial: u32) -> Self {
        Self(AtomicU32::new(initial))
    }

    pub fn set(&self, v: u32) {
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct MailboxU16(AtomicU16);

impl MailboxU16 {
    pub const fn new(initial: u16) -> Self {
        Self(AtomicU16::new(initial))
    }

    pub fn set(&self, v: u16) {
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Signed 32-bit mailbox used for message IDs, where a negative value means
/// "unassigned" / "no pending value".
#[derive(Debug)]
pub struct MailboxMsgId(AtomicI32);

impl MailboxMsgId {
    pub const NONE: i32 = -1;

    pub const fn new() -> Self {
        Self(AtomicI32::new(Self::NONE))
    }

    pub fn set(&self, v: i32) {
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Read-and-clear: returns the pending id, resetting the mailbox to
    /// `NONE`, or `None` if nothing was pending.
    pub fn take(&self) -> Option<i32> {
        let v = self.0.swap(Self::NONE, Ordering::Relaxed);
        if v < 0 {
            None
        } else {
            Some(v)
        }
    }
}

impl Default for MailboxMsgId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_latch_take_clears() {
        let l = EdgeLatch::new();
        assert!(!l.is_set());
        l.signal();
        assert!(l.is_set());
        assert!(l.take());
        assert!(!l.is_set());
        assert!(!l.take());
    }

    #[test]
    fn msg_id_take_semantics() {
        let m = MailboxMsgId::new();
        assert_eq!(m.take(), None);
        m.set(42);
        assert_eq!(m.take(), Some(42));
        assert_eq!(m.get(), MailboxMsgId::NONE);
    }
}
