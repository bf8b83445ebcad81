//! Arithmetic unit: SUM, RES, MULT, DIVI, and COMP.
//!
//! Every result that fits passes through the word codec, which sets the
//! condition code; a result whose magnitude doesn't fit raises `OVERFLOW`
//! with the unreduced value attached instead of writing `AC` — the
//! overflow handler is the one that writes `AC`, from that stashed value.

use lucario_core::{int_to_word, word_to_int, ConditionCode, Error, InterruptCode, Psw, Word};
use lucario_interrupt::InterruptController;

fn apply_checked(n: i64, ac: Word, psw: &mut Psw, interrupts: &InterruptController) -> Word {
    if n.unsigned_abs() as i64 > lucario_core::MAX_MAGNITUDE {
        interrupts.raise_related(InterruptCode::Overflow, n);
        ac
    } else {
        let (word, cc) = int_to_word(n);
        psw.cc = cc;
        word
    }
}

/// `AC <- AC + operand`.
pub fn sum(ac: Word, operand: Word, psw: &mut Psw, interrupts: &InterruptController) -> Word {
    let n = word_to_int(ac) + word_to_int(operand);
    apply_checked(n, ac, psw, interrupts)
}

/// `AC <- AC - operand`.
pub fn res(ac: Word, operand: Word, psw: &mut Psw, interrupts: &InterruptController) -> Word {
    let n = word_to_int(ac) - word_to_int(operand);
    apply_checked(n, ac, psw, interrupts)
}

/// `AC <- AC * operand`. The product is computed in a wider integer type
/// before reduction so the host multiplication itself never overflows,
/// regardless of how the two operands' magnitudes combine.
pub fn mult(ac: Word, operand: Word, psw: &mut Psw, interrupts: &InterruptController) -> Word {
    let n = i128::from(word_to_int(ac)) * i128::from(word_to_int(operand));
    if let Ok(n) = i64::try_from(n) {
        apply_checked(n, ac, psw, interrupts)
    } else {
        // Product doesn't even fit i64; still overflow, just report the
        // saturated magnitude as the related value.
        interrupts.raise_related(InterruptCode::Overflow, n.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64);
        ac
    }
}

/// `AC <- AC / operand` (integer division). Division by zero leaves `AC`
/// untouched, forces the condition code to `Overflow`, and is reported to
/// the caller as an `InvalidInstruction` error (which the control loop
/// turns into a halting `INVALID_INSTR` interrupt) rather than through the
/// `OVERFLOW` interrupt path.
pub fn divi(ac: Word, operand: Word, psw: &mut Psw, interrupts: &InterruptController) -> Result<Word, Error> {
    let divisor = word_to_int(operand);
    if divisor == 0 {
        psw.cc = ConditionCode::Overflow;
        return Err(Error::InvalidInstruction("division by zero"));
    }
    let n = word_to_int(ac) / divisor;
    Ok(apply_checked(n, ac, psw, interrupts))
}

/// `PSW.cc <- sign(AC - operand)`; `AC` is left untouched.
pub fn comp(ac: Word, operand: Word, psw: &mut Psw) {
    let n = word_to_int(ac) - word_to_int(operand);
    let (_, cc) = int_to_word(n);
    psw.cc = cc;
}
