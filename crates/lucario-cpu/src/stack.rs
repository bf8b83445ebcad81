//! The `PSH`/`POP` opcodes' stack discipline.
//!
//! This convention — write at the current `SP` then decrement for push,
//! increment then read at the new `SP` for pop — is the user-visible
//! stack contract (`SP` always points at the next free slot). It is
//! deliberately distinct from the interrupt controller's context
//! save/restore, which decrements before writing; see `lucario-interrupt`
//! dispatch in `interrupts.rs`.
//!
//! Accesses go through the general protected `Memory::read`/`Memory::write`
//! path, on top of the `RX`/`RL` bound checks below. That's only safe
//! because the partition check uses a closed `[RB, RL]` interval: the
//! loader places a program's initial `SP` exactly at `RL` once translated,
//! so an exclusive upper bound would reject the very first push.

use lucario_core::{int_to_word, word_to_int, ConditionCode, Error, Mode, Psw, Word};
use lucario_mmu::Memory;

/// `PSH`: if the stack would cross below `RX`, fail with a protection
/// fault; otherwise write `AC` at the current `SP` and decrement it.
pub fn push(
    ac: Word,
    sp: &mut usize,
    rx: usize,
    mode: Mode,
    rb: usize,
    rl: usize,
    memory: &Memory,
) -> Result<(), Error> {
    if sp.wrapping_sub(1) < rx || *sp == 0 {
        return Err(Error::ProtectionFault { addr: *sp, rb: rx, rl });
    }
    memory.write(*sp as i64, ac, mode, rb, rl)?;
    *sp -= 1;
    Ok(())
}

/// `POP`: if the stack would cross at or above `RL`, fail with a
/// protection fault; otherwise increment `SP`, read `AC` from the new
/// slot, and refresh the condition code from the loaded value's sign.
///
/// `sp` (like `rx`) is `RB`-relative, but `rl` is the absolute physical
/// upper bound of the partition — the pre-increment slot must be
/// translated by `rb` before comparing against it, or the check faults
/// spuriously in user mode (and never faults in kernel mode, where `rb`
/// happens to be zero).
pub fn pop(
    sp: &mut usize,
    rl: usize,
    mode: Mode,
    rb: usize,
    psw: &mut Psw,
    memory: &Memory,
) -> Result<Word, Error> {
    if *sp + 1 + rb > rl {
        return Err(Error::ProtectionFault { addr: *sp, rb, rl });
    }
    *sp += 1;
    let word = memory.read(*sp as i64, mode, rb, rl)?;
    let (normalized, cc) = int_to_word(word_to_int(word));
    psw.cc = cc;
    Ok(normalized)
}
