//! Operand resolver: turns `(mode, operand)` into either a value or an
//! effective address, per the addressing-mode rules.

use lucario_core::{int_to_word, word_to_int, Error, Mode, Psw, Word};
use lucario_mmu::Memory;

use crate::decode::AddressingMode;

/// Resolve an operand to a value, for ALU/LOAD/COMP/timer inputs.
///
/// `Immediate` runs the raw operand through the word codec, which — as a
/// side effect — sets `psw.cc` from its sign; `Direct`/`Indexed` read
/// memory and leave `psw.cc` untouched.
pub fn resolve_operand(
    psw: &mut Psw,
    mode: AddressingMode,
    operand: i64,
    ac: Word,
    memory: &Memory,
    rb: usize,
    rl: usize,
) -> Result<Word, Error> {
    match mode {
        AddressingMode::Immediate => {
            let (word, cc) = int_to_word(operand);
            psw.cc = cc;
            Ok(word)
        }
        AddressingMode::Direct => memory.read(operand, psw.mode, rb, rl),
        AddressingMode::Indexed => {
            let eff = operand + word_to_int(ac);
            memory.read(eff, psw.mode, rb, rl)
        }
    }
}

/// Resolve an operand to an effective address, for `STR`, jumps, and
/// DMA-mem targets.
///
/// `guard_immediate` rejects `Immediate` mode for the operations whose
/// semantics require a real address (`STR`); other consumers (`J`, the
/// conditional jumps) treat an `Immediate` operand as a literal address.
pub fn effective_address(
    mode: AddressingMode,
    operand: i64,
    ac: Word,
    guard_immediate: bool,
) -> Result<i64, Error> {
    match mode {
        AddressingMode::Direct => Ok(operand),
        AddressingMode::Indexed => Ok(operand + word_to_int(ac)),
        AddressingMode::Immediate if guard_immediate => Err(Error::InvalidAddress),
        AddressingMode::Immediate => Ok(operand),
    }
}
