//! The interrupt controller's pending bitmap, priority selection, and
//! handler policy.
//!
//! Context save/restore needs the register file and the stack, so the
//! actual dispatch sequence lives in `lucario-cpu`; this crate owns the
//! bookkeeping dispatch consults: which codes are pending, which one wins
//! when several are, and whether a given code's handler halts the CPU or
//! lets it continue.

use std::sync::{Arc, Mutex};

use lucario_core::InterruptCode;

/// What a handler does once it finishes running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Continue,
    Stop,
}

/// The fixed handler policy for every code except `Syscall`, whose outcome
/// depends on the accumulator's value at dispatch time and so is decided by
/// the caller, not here.
#[must_use]
pub const fn default_outcome(code: InterruptCode) -> Option<HandlerOutcome> {
    match code {
        InterruptCode::InvalidInstr | InterruptCode::InvalidAddr => Some(HandlerOutcome::Stop),
        InterruptCode::Overflow
        | InterruptCode::Underflow
        | InterruptCode::Timer
        | InterruptCode::IoDone
        | InterruptCode::InvalidSyscall
        | InterruptCode::InvalidIntCode => Some(HandlerOutcome::Continue),
        InterruptCode::Syscall => None,
    }
}

fn slot(code: InterruptCode) -> usize {
    InterruptCode::PRIORITY_ORDER
        .iter()
        .position(|c| *c == code)
        .expect("PRIORITY_ORDER enumerates every InterruptCode variant")
}

#[derive(Default)]
struct Pending {
    bits: [bool; 9],
    aux: [Option<i64>; 9],
}

/// The pending-bitmap interrupt controller. Cheap to clone — clones share
/// the same bitmap, since the DMA worker thread raises interrupts (`IoDone`,
/// `InvalidAddr`) concurrently with the CPU thread consuming them.
#[derive(Clone)]
pub struct InterruptController {
    inner: Arc<Mutex<Pending>>,
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Set `code`'s pending bit.
    pub fn raise(&self, code: InterruptCode) {
        log::warn!(target: "lucario::hardware", "interrupt raised: {code:?}");
        self.inner.lock().expect("interrupt lock poisoned").bits[slot(code)] = true;
    }

    /// Set `code`'s pending bit and stash an auxiliary value (the
    /// pre-reduction result `OVERFLOW`'s handler needs).
    pub fn raise_related(&self, code: InterruptCode, value: i64) {
        log::warn!(target: "lucario::hardware", "interrupt raised: {code:?} (related={value})");
        let mut guard = self.inner.lock().expect("interrupt lock poisoned");
        guard.bits[slot(code)] = true;
        guard.aux[slot(code)] = Some(value);
    }

    /// The highest-priority pending code, if any. Does not clear it — the
    /// dispatcher clears the bit only once its handler has actually run.
    #[must_use]
    pub fn highest_pending(&self) -> Option<InterruptCode> {
        let guard = self.inner.lock().expect("interrupt lock poisoned");
        InterruptCode::PRIORITY_ORDER
            .into_iter()
            .find(|code| guard.bits[slot(*code)])
    }

    /// Take (and clear) the auxiliary value stashed for `code`, if any.
    pub fn take_related(&self, code: InterruptCode) -> Option<i64> {
        self.inner.lock().expect("interrupt lock poisoned").aux[slot(code)].take()
    }

    /// Clear `code`'s pending bit, once its handler has run.
    pub fn clear(&self, code: InterruptCode) {
        self.inner.lock().expect("interrupt lock poisoned").bits[slot(code)] = false;
    }

    /// Clear every pending bit and auxiliary value. Called by `reset`.
    pub fn reset(&self) {
        *self.inner.lock().expect("interrupt lock poisoned") = Pending::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_prefers_hardware_over_syscall_over_async() {
        let ctl = InterruptController::new();
        ctl.raise(InterruptCode::Timer);
        ctl.raise(InterruptCode::Syscall);
        assert_eq!(ctl.highest_pending(), Some(InterruptCode::Syscall));
        ctl.raise(InterruptCode::InvalidAddr);
        assert_eq!(ctl.highest_pending(), Some(InterruptCode::InvalidAddr));
    }

    #[test]
    fn clearing_removes_from_selection() {
        let ctl = InterruptController::new();
        ctl.raise(InterruptCode::IoDone);
        ctl.clear(InterruptCode::IoDone);
        assert_eq!(ctl.highest_pending(), None);
    }

    #[test]
    fn related_value_round_trips_once() {
        let ctl = InterruptController::new();
        ctl.raise_related(InterruptCode::Overflow, 10_000_005);
        assert_eq!(ctl.take_related(InterruptCode::Overflow), Some(10_000_005));
        assert_eq!(ctl.take_related(InterruptCode::Overflow), None);
    }

    #[test]
    fn reset_clears_everything() {
        let ctl = InterruptController::new();
        ctl.raise(InterruptCode::Timer);
        ctl.reset();
        assert_eq!(ctl.highest_pending(), None);
    }
}
