//! The interrupt dispatch protocol: context save/restore on the user
//! stack, running the handler policy table, and deciding whether a
//! `step()` continues or halts.
//!
//! `lucario-interrupt` owns the pending bitmap and priority selection;
//! this module owns the part that needs the register file and `Memory`
//! — saving and restoring a context is indistinguishable from any other
//! memory access from the bus lock's point of view.

use lucario_core::{int_to_word, word_to_int, ConditionCode, InterruptCode, Mode, Word};
use lucario_interrupt::{HandlerOutcome, InterruptController};
use lucario_mmu::Memory;

use crate::registers::Registers;

/// Why `step()` stopped the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    InvalidInstruction,
    InvalidAddress,
    SyscallExit,
}

/// What `step()` reports after fetch/decode/execute/tick/service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halt(HaltReason),
}

fn mode_to_word(mode: Mode) -> Word {
    match mode {
        Mode::User => 0,
        Mode::Kernel => 1,
    }
}

fn word_to_mode(w: Word) -> Mode {
    if w == 0 {
        Mode::User
    } else {
        Mode::Kernel
    }
}

fn cc_to_word(cc: ConditionCode) -> Word {
    match cc {
        ConditionCode::Zero => 0,
        ConditionCode::Neg => 1,
        ConditionCode::Pos => 2,
        ConditionCode::Overflow => 3,
    }
}

fn word_to_cc(w: Word) -> ConditionCode {
    match w {
        1 => ConditionCode::Neg,
        2 => ConditionCode::Pos,
        3 => ConditionCode::Overflow,
        _ => ConditionCode::Zero,
    }
}

fn push_word(value: Word, regs: &mut Registers, memory: &Memory) -> Option<()> {
    let sp = regs.sp.checked_sub(1)?;
    memory.write(sp as i64, value, regs.psw.mode, regs.rb, regs.rl).ok()?;
    regs.sp = sp;
    Some(())
}

fn pop_word(regs: &mut Registers, memory: &Memory) -> Option<Word> {
    let word = memory.read(regs.sp as i64, regs.psw.mode, regs.rb, regs.rl).ok()?;
    regs.sp += 1;
    Some(word)
}

/// Push `RX, RL, RB, mode, cc, PC, AC` in that order — `AC` ends up on
/// top of the stack. Returns `None` if any push fails (the stack region
/// is exhausted or the target address is unreadable); the caller treats
/// that as a fatal halt, since a context that cannot be saved cannot be
/// restored either.
fn push_context(regs: &mut Registers, memory: &Memory) -> Option<()> {
    push_word(int_to_word(regs.rx as i64).0, regs, memory)?;
    push_word(int_to_word(regs.rl as i64).0, regs, memory)?;
    push_word(int_to_word(regs.rb as i64).0, regs, memory)?;
    push_word(mode_to_word(regs.psw.mode), regs, memory)?;
    push_word(cc_to_word(regs.psw.cc), regs, memory)?;
    push_word(int_to_word(regs.psw.pc as i64).0, regs, memory)?;
    push_word(regs.ac, regs, memory)?;
    Some(())
}

/// Pop the context pushed by [`push_context`], in reverse order.
/// `discard_ac` is set for `OVERFLOW`/`UNDERFLOW`, whose handlers have
/// already written `AC` themselves — the popped value is read (to keep
/// `SP` balanced) but not written back.
fn pop_context(regs: &mut Registers, memory: &Memory, discard_ac: bool) -> Option<()> {
    let saved_ac = pop_word(regs, memory)?;
    let saved_pc = pop_word(regs, memory)?;
    let saved_cc = pop_word(regs, memory)?;
    let saved_mode = pop_word(regs, memory)?;
    let saved_rb = pop_word(regs, memory)?;
    let saved_rl = pop_word(regs, memory)?;
    let saved_rx = pop_word(regs, memory)?;

    if !discard_ac {
        regs.ac = saved_ac;
    }
    regs.psw.pc = usize::try_from(word_to_int(saved_pc)).ok()?;
    regs.psw.cc = word_to_cc(saved_cc);
    regs.psw.mode = word_to_mode(saved_mode);
    regs.rb = usize::try_from(word_to_int(saved_rb)).ok()?;
    regs.rl = usize::try_from(word_to_int(saved_rl)).ok()?;
    regs.rx = usize::try_from(word_to_int(saved_rx)).ok()?;
    Some(())
}

/// Run the policy for every handler except `Syscall`, whose outcome
/// depends on `AC`'s value at dispatch time.
fn run_handler(code: InterruptCode, regs: &mut Registers, interrupts: &InterruptController) -> HandlerOutcome {
    match code {
        InterruptCode::InvalidInstr => {
            log::error!(target: "lucario::kernel", "invalid instruction: CPU halt triggered");
            HandlerOutcome::Stop
        }
        InterruptCode::InvalidAddr => {
            log::error!(target: "lucario::kernel", "invalid memory address: CPU halt triggered");
            HandlerOutcome::Stop
        }
        InterruptCode::Overflow => {
            let related = interrupts.take_related(InterruptCode::Overflow).unwrap_or(0);
            // Reduce modulo (MAX_MAGNITUDE+1) before re-encoding, so the
            // result fits and `int_to_word` reports the reduced value's own
            // sign rather than re-flagging `Overflow`.
            let reduced = related % (lucario_core::MAX_MAGNITUDE + 1);
            let (word, cc) = int_to_word(reduced);
            log::info!(target: "lucario::kernel", "arithmetic overflow: {related} -> {}", word_to_int(word));
            regs.ac = word;
            regs.psw.cc = cc;
            HandlerOutcome::Continue
        }
        InterruptCode::Underflow => {
            log::info!(target: "lucario::kernel", "arithmetic underflow: value clamped to 0");
            regs.ac = 0;
            regs.psw.cc = ConditionCode::Zero;
            HandlerOutcome::Continue
        }
        InterruptCode::Timer => {
            log::debug!(target: "lucario::kernel", "timer interrupt (scheduler hook)");
            HandlerOutcome::Continue
        }
        InterruptCode::IoDone => {
            log::debug!(target: "lucario::kernel", "I/O done interrupt (scheduler hook)");
            HandlerOutcome::Continue
        }
        InterruptCode::InvalidSyscall => {
            log::error!(target: "lucario::kernel", "invalid syscall code");
            HandlerOutcome::Continue
        }
        InterruptCode::InvalidIntCode => {
            log::error!(target: "lucario::kernel", "unrecognized interrupt code");
            HandlerOutcome::Continue
        }
        InterruptCode::Syscall => unreachable!("Syscall's outcome depends on AC; handled by the caller"),
    }
}

fn syscall_outcome(regs: &Registers) -> HandlerOutcome {
    if word_to_int(regs.ac) == 0 {
        log::info!(target: "lucario::kernel", "syscall [0]: program requested EXIT");
        HandlerOutcome::Stop
    } else {
        log::info!(target: "lucario::kernel", "syscall [{}]: service acknowledged", word_to_int(regs.ac));
        HandlerOutcome::Continue
    }
}

fn reason_for(code: InterruptCode) -> HaltReason {
    match code {
        InterruptCode::InvalidInstr => HaltReason::InvalidInstruction,
        InterruptCode::Syscall => HaltReason::SyscallExit,
        _ => HaltReason::InvalidAddress,
    }
}

/// The dispatch protocol: disable interrupts, save context, run the
/// handler, clear the bit, conditionally restore context, re-enable
/// interrupts. Called once per `step()`, after the timer tick.
pub fn service(regs: &mut Registers, memory: &Memory, interrupts: &InterruptController) -> StepOutcome {
    if !regs.psw.interrupts_enabled {
        return StepOutcome::Continue;
    }
    let Some(code) = interrupts.highest_pending() else {
        return StepOutcome::Continue;
    };

    regs.psw.interrupts_enabled = false;

    if push_context(regs, memory).is_none() {
        return StepOutcome::Halt(HaltReason::InvalidAddress);
    }

    let outcome = if code == InterruptCode::Syscall {
        syscall_outcome(regs)
    } else {
        run_handler(code, regs, interrupts)
    };

    interrupts.clear(code);

    if outcome == HandlerOutcome::Continue {
        let discard_ac = matches!(code, InterruptCode::Overflow | InterruptCode::Underflow);
        if pop_context(regs, memory, discard_ac).is_none() {
            return StepOutcome::Halt(HaltReason::InvalidAddress);
        }
    }

    regs.psw.interrupts_enabled = true;

    match outcome {
        HandlerOutcome::Continue => StepOutcome::Continue,
        HandlerOutcome::Stop => StepOutcome::Halt(reason_for(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucario_core::Psw;

    fn running_registers(rb: usize, rl: usize, sp: usize) -> Registers {
        let mut regs = Registers::new();
        regs.rb = rb;
        regs.rl = rl;
        regs.rx = rb;
        regs.sp = sp;
        regs.psw = Psw {
            cc: ConditionCode::Pos,
            mode: Mode::User,
            interrupts_enabled: true,
            pc: 42,
        };
        regs.ac = int_to_word(7).0;
        regs
    }

    #[test]
    fn overflow_rewrites_ac_and_restores_everything_else() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = running_registers(300, 500, 180);

        interrupts.raise_related(InterruptCode::Overflow, 10_000_005);
        let outcome = service(&mut regs, &memory, &interrupts);

        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(word_to_int(regs.ac), 5);
        assert_eq!(regs.psw.pc, 42);
        assert_eq!(regs.sp, 180);
        assert!(regs.psw.interrupts_enabled);
        assert_eq!(interrupts.highest_pending(), None);
    }

    #[test]
    fn invalid_instr_halts_without_restoring_context() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = running_registers(300, 500, 180);

        interrupts.raise(InterruptCode::InvalidInstr);
        let outcome = service(&mut regs, &memory, &interrupts);

        assert_eq!(outcome, StepOutcome::Halt(HaltReason::InvalidInstruction));
        // Context was pushed but never popped: SP moved down by 7.
        assert_eq!(regs.sp, 173);
    }

    #[test]
    fn syscall_zero_halts_nonzero_continues() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();

        let mut exiting = running_registers(300, 500, 180);
        exiting.ac = 0;
        interrupts.raise(InterruptCode::Syscall);
        assert_eq!(service(&mut exiting, &memory, &interrupts), StepOutcome::Halt(HaltReason::SyscallExit));

        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut servicing = running_registers(300, 500, 180);
        servicing.ac = int_to_word(3).0;
        interrupts.raise(InterruptCode::Syscall);
        assert_eq!(service(&mut servicing, &memory, &interrupts), StepOutcome::Continue);
        assert_eq!(word_to_int(servicing.ac), 3);
    }

    #[test]
    fn disabled_interrupts_are_not_serviced() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = running_registers(300, 500, 180);
        regs.psw.interrupts_enabled = false;

        interrupts.raise(InterruptCode::Timer);
        assert_eq!(service(&mut regs, &memory, &interrupts), StepOutcome::Continue);
        assert_eq!(interrupts.highest_pending(), Some(InterruptCode::Timer));
    }
}
