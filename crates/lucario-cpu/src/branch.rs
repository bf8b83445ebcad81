//! Branching unit: the unconditional jump and the four conditional jumps.

use lucario_core::{word_to_int, Error, Mode, Word};
use lucario_mmu::Memory;

use crate::decode::AddressingMode;
use crate::operand::effective_address;

/// The four conditional jump predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
}

impl Predicate {
    fn holds(self, ac: i64, stack_top: i64) -> bool {
        match self {
            Self::Equal => ac == stack_top,
            Self::NotEqual => ac != stack_top,
            Self::LessThan => ac < stack_top,
            Self::GreaterThan => ac > stack_top,
        }
    }
}

/// Resolve `J`'s target address. Flags are left untouched.
pub fn unconditional_target(mode: AddressingMode, operand: i64, ac: Word) -> Result<i64, Error> {
    effective_address(mode, operand, ac, false)
}

/// Evaluate a conditional jump: read the stack-top value, compare it
/// against `AC` under `predicate`, and return the target address if the
/// jump is taken. Flags are never mutated by a branch.
pub fn conditional_target(
    predicate: Predicate,
    mode: AddressingMode,
    operand: i64,
    ac: Word,
    memory: &Memory,
    cpu_mode: Mode,
    sp: usize,
    rb: usize,
    rl: usize,
) -> Result<Option<i64>, Error> {
    let stack_top = memory.read(sp as i64, cpu_mode, rb, rl)?;
    if !predicate.holds(word_to_int(ac), word_to_int(stack_top)) {
        return Ok(None);
    }
    effective_address(mode, operand, ac, false).map(Some)
}
