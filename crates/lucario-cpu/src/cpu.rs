//! The CPU control loop: `fetch`, `decode`, `execute`, tick the timer,
//! service interrupts — repeated by `run()` until the CPU halts.

use lucario_core::{Error, InterruptCode};
use lucario_interrupt::InterruptController;
use lucario_mmu::Memory;

use crate::execute::execute;
use crate::interrupts::{service, HaltReason, StepOutcome};
use crate::registers::Registers;

/// Maps a failed execution unit's error to the interrupt that reports
/// it: an unrecognized opcode/mode or a guarded illegal operand is
/// `INVALID_INSTR`; every memory-path failure (bounds, protection,
/// encoding, unreadable effective address) is `INVALID_ADDR`.
fn raise_for_error(err: Error, interrupts: &InterruptController) {
    match err {
        Error::InvalidInstruction(_) => interrupts.raise(InterruptCode::InvalidInstr),
        Error::OutOfBounds(_) | Error::ProtectionFault { .. } | Error::InvalidData(_) | Error::InvalidAddress => {
            interrupts.raise(InterruptCode::InvalidAddr);
        }
    }
}

/// The CPU: a register file plus the `step`/`run`/`reset` driver.
/// Cheap to construct; holds no shared state of its own — `Memory` and
/// `InterruptController` are handed in by the composition root
/// (`lucario-machine`) on every call, since those are the values shared
/// with the DMA worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cpu {
    pub registers: Registers,
}

impl Cpu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the register file to its reset state. Does not touch RAM,
    /// the disk, or the DMA registers — those are reset independently by
    /// the composition root.
    pub fn reset(&mut self) {
        self.registers = Registers::new();
    }

    /// One instruction cycle: fetch, decode, execute, tick the timer,
    /// service interrupts. Returns whether the CPU should keep running.
    pub fn step(&mut self, memory: &Memory, interrupts: &InterruptController) -> StepOutcome {
        let regs = &mut self.registers;
        let pc = regs.psw.pc;
        match memory.read(pc as i64, regs.psw.mode, regs.rb, regs.rl) {
            Ok(word) => {
                regs.mar = pc as i64;
                regs.mdr = word;
                regs.ir = word;
                regs.psw.pc += 1;
                if let Err(err) = execute(word, regs, memory, interrupts) {
                    raise_for_error(err, interrupts);
                }
            }
            Err(_) => {
                interrupts.raise(InterruptCode::InvalidAddr);
            }
        }

        regs.cycles_counter += 1;
        if regs.timer_limit > 0 && regs.cycles_counter >= regs.timer_limit {
            regs.cycles_counter = 0;
            interrupts.raise(InterruptCode::Timer);
        }

        service(regs, memory, interrupts)
    }

    /// Run `step()` until the CPU halts, returning why.
    pub fn run(&mut self, memory: &Memory, interrupts: &InterruptController) -> HaltReason {
        loop {
            if let StepOutcome::Halt(reason) = self.step(memory, interrupts) {
                return reason;
            }
        }
    }
}
