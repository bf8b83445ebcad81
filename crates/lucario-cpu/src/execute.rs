//! Opcode dispatch: turns a decoded instruction into a call against the
//! arithmetic, branching, stack, data-movement, or DMA-program unit.
//!
//! Modeled as a single `match` over a closed 34-variant enum rather than
//! virtual dispatch, per §9's "dynamic dispatch on opcodes" design note
//! — the opcode set is fixed and fully enumerated.

use lucario_core::{Error, InterruptCode, Mode, Word};
use lucario_interrupt::InterruptController;
use lucario_mmu::Memory;

use crate::arithmetic;
use crate::branch::{self, Predicate};
use crate::data_movement;
use crate::decode::{decode, AddressingMode, Opcode};
use crate::dma_program;
use crate::operand::resolve_operand;
use crate::registers::Registers;
use crate::stack;

fn validate_target(target: i64, mode: Mode, rb: usize, rl: usize) -> Result<usize, Error> {
    Memory::validate_address(target, mode, rb, rl)?;
    usize::try_from(target).map_err(|_| Error::InvalidAddress)
}

/// Execute one already-fetched instruction word against `regs`, mutating
/// it in place. Returns `Ok(())` on success; any `Err` is the failure the
/// CPU control loop converts into an interrupt.
pub fn execute(word: Word, regs: &mut Registers, memory: &Memory, interrupts: &InterruptController) -> Result<(), Error> {
    let decoded = decode(word);
    let opcode = Opcode::try_from(decoded.opcode)?;
    let mode = AddressingMode::try_from(decoded.mode)?;
    let operand = decoded.operand;
    let ac = regs.ac;
    let cpu_mode = regs.psw.mode;
    let rb = regs.rb;
    let rl = regs.rl;

    match opcode {
        Opcode::Sum => {
            let value = resolve_operand(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
            regs.ac = arithmetic::sum(ac, value, &mut regs.psw, interrupts);
        }
        Opcode::Res => {
            let value = resolve_operand(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
            regs.ac = arithmetic::res(ac, value, &mut regs.psw, interrupts);
        }
        Opcode::Mult => {
            let value = resolve_operand(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
            regs.ac = arithmetic::mult(ac, value, &mut regs.psw, interrupts);
        }
        Opcode::Divi => {
            let value = resolve_operand(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
            regs.ac = arithmetic::divi(ac, value, &mut regs.psw, interrupts)?;
        }
        Opcode::Load => {
            regs.ac = data_movement::load(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
        }
        Opcode::Str => {
            data_movement::str_op(mode, operand, ac, cpu_mode, rb, rl, memory)?;
        }
        Opcode::LoadRx => {
            regs.ac = data_movement::load_register(regs.rx);
        }
        Opcode::StrRx => {
            regs.rx = data_movement::store_register(ac)?;
        }
        Opcode::Comp => {
            let value = resolve_operand(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
            arithmetic::comp(ac, value, &mut regs.psw);
        }
        Opcode::JmpE | Opcode::JmpNe | Opcode::JmpLt | Opcode::JmpLgt => {
            let predicate = match opcode {
                Opcode::JmpE => Predicate::Equal,
                Opcode::JmpNe => Predicate::NotEqual,
                Opcode::JmpLt => Predicate::LessThan,
                Opcode::JmpLgt => Predicate::GreaterThan,
                _ => unreachable!(),
            };
            if let Some(target) = branch::conditional_target(predicate, mode, operand, ac, memory, cpu_mode, regs.sp, rb, rl)? {
                regs.psw.pc = validate_target(target, cpu_mode, rb, rl)?;
            }
        }
        Opcode::Svc => {
            interrupts.raise(InterruptCode::Syscall);
        }
        Opcode::Retrn => {
            let word = memory.read(regs.sp as i64, cpu_mode, rb, rl)?;
            regs.psw.pc = validate_target(lucario_core::word_to_int(word), cpu_mode, rb, rl)?;
            regs.sp += 1;
        }
        Opcode::Hab => {
            regs.psw.interrupts_enabled = true;
        }
        Opcode::Dhab => {
            regs.psw.interrupts_enabled = false;
        }
        Opcode::Tti => {
            regs.timer_limit = data_movement::tti(&mut regs.psw, mode, operand, ac, memory, rb, rl)?;
        }
        Opcode::Chmod => {
            regs.psw.mode = data_movement::chmod(operand)?;
        }
        Opcode::LoadRb => {
            regs.ac = data_movement::load_register(regs.rb);
        }
        Opcode::StrRb => {
            regs.rb = data_movement::store_register(ac)?;
        }
        Opcode::LoadRl => {
            regs.ac = data_movement::load_register(regs.rl);
        }
        Opcode::StrRl => {
            regs.rl = data_movement::store_register(ac)?;
        }
        Opcode::LoadSp => {
            regs.ac = data_movement::load_sp(cpu_mode, regs.sp, rb, rl, memory)?;
        }
        Opcode::StrSp => {
            data_movement::store_sp(ac, cpu_mode, regs.sp, rb, rl, memory)?;
        }
        Opcode::Psh => {
            stack::push(ac, &mut regs.sp, regs.rx, cpu_mode, rb, rl, memory)?;
        }
        Opcode::Pop => {
            regs.ac = stack::pop(&mut regs.sp, rl, cpu_mode, rb, &mut regs.psw, memory)?;
        }
        Opcode::J => {
            let target = branch::unconditional_target(mode, operand, ac)?;
            regs.psw.pc = validate_target(target, cpu_mode, rb, rl)?;
        }
        Opcode::SdmaP => dma_program::sdmap(&mut regs.psw, mode, operand, ac, memory, rb, rl)?,
        Opcode::SdmaC => dma_program::sdmac(&mut regs.psw, mode, operand, ac, memory, rb, rl)?,
        Opcode::SdmaS => dma_program::sdmas(&mut regs.psw, mode, operand, ac, memory, rb, rl)?,
        Opcode::SdmaIo => dma_program::sdmaio(&mut regs.psw, mode, operand, ac, memory, rb, rl)?,
        Opcode::SdmaM => dma_program::sdmam(&mut regs.psw, mode, operand, ac, memory, cpu_mode, rb, rl)?,
        Opcode::SdmaOn => dma_program::sdmaon(memory),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucario_core::{int_to_word, word_to_int};

    fn regs_with(rb: usize, rl: usize, rx: usize, sp: usize) -> Registers {
        let mut regs = Registers::new();
        regs.rb = rb;
        regs.rl = rl;
        regs.rx = rx;
        regs.sp = sp;
        regs.psw.mode = Mode::Kernel;
        regs
    }

    fn word(opcode: i64, mode: i64, operand: i64) -> Word {
        opcode * 1_000_000 + mode * 100_000 + operand
    }

    #[test]
    fn s1_addition() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(0, 0, 0, 0);

        execute(word(4, 1, 7), &mut regs, &memory, &interrupts).unwrap(); // LOAD Immediate 7
        execute(word(0, 1, 5), &mut regs, &memory, &interrupts).unwrap(); // SUM Immediate 5

        assert_eq!(word_to_int(regs.ac), 12);
        assert_eq!(regs.psw.cc, lucario_core::ConditionCode::Pos);
    }

    #[test]
    fn s3_protection_fault_on_str_outside_partition() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(300, 400, 310, 400);
        regs.psw.mode = Mode::User;
        regs.ac = int_to_word(42).0;

        let err = execute(word(5, 0, 500), &mut regs, &memory, &interrupts).unwrap_err();
        assert!(matches!(err, Error::ProtectionFault { .. }));
        assert_eq!(memory.read(500, Mode::Kernel, 0, 0).unwrap(), 0);
    }

    #[test]
    fn s4_push_pop_round_trip() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(0, 500, 310, 500);
        regs.ac = int_to_word(123).0;

        execute(word(25, 0, 0), &mut regs, &memory, &interrupts).unwrap(); // PSH
        regs.ac = 0;
        execute(word(26, 0, 0), &mut regs, &memory, &interrupts).unwrap(); // POP

        assert_eq!(regs.sp, 500);
        assert_eq!(word_to_int(regs.ac), 123);
    }

    #[test]
    fn s5_conditional_branch_does_not_touch_flags() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(0, 0, 0, 500);
        memory.write(500, int_to_word(50).0, Mode::Kernel, 0, 0).unwrap();
        regs.ac = int_to_word(40).0;
        regs.psw.cc = lucario_core::ConditionCode::Overflow;

        execute(word(11, 1, 200), &mut regs, &memory, &interrupts).unwrap(); // JMPLT Immediate 200

        assert_eq!(regs.psw.pc, 200);
        assert_eq!(regs.psw.cc, lucario_core::ConditionCode::Overflow);
    }

    #[test]
    fn s6_dma_program_sets_registers() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(0, 0, 0, 0);
        memory.write(456, int_to_word(1_234_567).0, Mode::Kernel, 0, 0).unwrap();

        execute(word(28, 1, 1), &mut regs, &memory, &interrupts).unwrap(); // SDMAP 1
        execute(word(29, 1, 2), &mut regs, &memory, &interrupts).unwrap(); // SDMAC 2
        execute(word(30, 1, 3), &mut regs, &memory, &interrupts).unwrap(); // SDMAS 3
        execute(word(31, 1, 1), &mut regs, &memory, &interrupts).unwrap(); // SDMAIO 1 (RAM->Disk)
        execute(word(32, 1, 456), &mut regs, &memory, &interrupts).unwrap(); // SDMAM 456

        let snap = memory.dma_snapshot();
        assert_eq!((snap.track, snap.cylinder, snap.sector, snap.mem_addr), (1, 2, 3, 456));
    }

    #[test]
    fn divi_by_zero_is_invalid_instruction() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(0, 0, 0, 0);
        regs.ac = int_to_word(10).0;

        let err = execute(word(3, 1, 0), &mut regs, &memory, &interrupts).unwrap_err();
        assert!(matches!(err, Error::InvalidInstruction(_)));
    }

    #[test]
    fn unknown_opcode_is_invalid_instruction() {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let mut regs = regs_with(0, 0, 0, 0);

        let err = execute(word(99, 0, 0), &mut regs, &memory, &interrupts).unwrap_err();
        assert!(matches!(err, Error::InvalidInstruction(_)));
    }
}
