//! Data movement unit: `LOAD`/`STR`, the register-transfer opcodes
//! (`LOADRX`/`STRRX`, `LOADRB`/`STRRB`, `LOADRL`/`STRRL`,
//! `LOADSP`/`STRSP`), `CHMOD`, `TTI`, and `HAB`/`DHAB`.
//!
//! `LOADRX`/`STRRX`/`LOADRB`/`STRRB`/`LOADRL`/`STRRL` move a register's
//! value directly to or from `AC`. The `SP` pair is different: per
//! spec.md's wording ("the SP variants move through memory at M[SP]"),
//! `LOADSP`/`STRSP` move through the memory cell the stack pointer
//! currently addresses, not the register itself.

use lucario_core::{int_to_word, word_to_int, Error, Mode, Psw, Word};
use lucario_mmu::Memory;

use crate::decode::AddressingMode;
use crate::operand::{effective_address, resolve_operand};

/// Convert a register-transfer source word into a non-negative address.
/// Registers in this implementation are typed `usize` (an address
/// coordinate), not a raw decimal word, so a negative decoded value has
/// no legal destination register and is reported as `InvalidInstruction`
/// rather than silently truncated.
fn to_register_value(word: Word) -> Result<usize, Error> {
    usize::try_from(word_to_int(word)).map_err(|_| Error::InvalidInstruction("register value must be non-negative"))
}

/// `STR`: write `AC` to the effective address. `Immediate` mode has no
/// address to write to and is rejected.
pub fn str_op(mode: AddressingMode, operand: i64, ac: Word, cpu_mode: Mode, rb: usize, rl: usize, memory: &Memory) -> Result<(), Error> {
    let eff = effective_address(mode, operand, ac, true)?;
    memory.write(eff, ac, cpu_mode, rb, rl)
}

/// `LOAD`: `AC <- resolve(operand)`.
pub fn load(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<Word, Error> {
    let value = resolve_operand(psw, mode, operand, ac, memory, rb, rl)?;
    let (_, cc) = int_to_word(word_to_int(value));
    psw.cc = cc;
    Ok(value)
}

/// `LOADRX`/`LOADRB`/`LOADRL`: `AC <- word(register)`.
#[must_use]
pub fn load_register(value: usize) -> Word {
    int_to_word(value as i64).0
}

/// `STRRX`/`STRRB`/`STRRL`: `register <- addr(AC)`.
pub fn store_register(ac: Word) -> Result<usize, Error> {
    to_register_value(ac)
}

/// `LOADSP`: `AC <- M[SP]`.
pub fn load_sp(mode: Mode, sp: usize, rb: usize, rl: usize, memory: &Memory) -> Result<Word, Error> {
    memory.read(sp as i64, mode, rb, rl)
}

/// `STRSP`: `M[SP] <- AC`.
pub fn store_sp(ac: Word, mode: Mode, sp: usize, rb: usize, rl: usize, memory: &Memory) -> Result<(), Error> {
    memory.write(sp as i64, ac, mode, rb, rl)
}

/// `CHMOD`: operand `0` switches to `USER`, `1` to `KERNEL`; anything
/// else is `InvalidInstruction`. Uses the raw decoded operand digits,
/// not an address-mode resolution — the opcode only distinguishes two
/// literal values.
pub fn chmod(operand: i64) -> Result<Mode, Error> {
    match operand {
        0 => Ok(Mode::User),
        1 => Ok(Mode::Kernel),
        _ => Err(Error::InvalidInstruction("CHMOD operand must be 0 or 1")),
    }
}

/// `TTI`: `timerLimit <- resolve(operand)`. The resolved value must be
/// non-negative; a negative interval has no sensible cycle-count meaning.
pub fn tti(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<u64, Error> {
    let value = resolve_operand(psw, mode, operand, ac, memory, rb, rl)?;
    let n = word_to_int(value);
    u64::try_from(n).map_err(|_| Error::InvalidInstruction("timer interval must be non-negative"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucario_core::ConditionCode;

    #[test]
    fn str_rejects_immediate_mode() {
        let memory = Memory::new();
        let err = str_op(AddressingMode::Immediate, 5, 0, Mode::Kernel, 0, 0, &memory).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress));
    }

    #[test]
    fn str_writes_ac_at_effective_address() {
        let memory = Memory::new();
        str_op(AddressingMode::Direct, 10, 42, Mode::Kernel, 0, 0, &memory).unwrap();
        assert_eq!(memory.read(10, Mode::Kernel, 0, 0).unwrap(), 42);
    }

    #[test]
    fn load_immediate_sets_condition_code() {
        let mut psw = Psw::new();
        let memory = Memory::new();
        let v = load(&mut psw, AddressingMode::Immediate, 7, 0, &memory, 0, 0).unwrap();
        assert_eq!(v, 7);
        assert_eq!(psw.cc, ConditionCode::Pos);
    }

    #[test]
    fn register_round_trip() {
        let w = load_register(310);
        assert_eq!(store_register(w).unwrap(), 310);
    }

    #[test]
    fn store_register_rejects_negative() {
        let negative_ac = 10_000_005; // word_to_int == -5
        assert!(store_register(negative_ac).is_err());
    }

    #[test]
    fn chmod_accepts_only_zero_or_one() {
        assert_eq!(chmod(0).unwrap(), Mode::User);
        assert_eq!(chmod(1).unwrap(), Mode::Kernel);
        assert!(chmod(2).is_err());
    }

    #[test]
    fn tti_resolves_operand_to_u64() {
        let mut psw = Psw::new();
        let memory = Memory::new();
        let limit = tti(&mut psw, AddressingMode::Immediate, 16, 0, &memory, 0, 0).unwrap();
        assert_eq!(limit, 16);
    }
}
