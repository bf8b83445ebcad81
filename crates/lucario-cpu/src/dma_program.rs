//! The DMA-program opcodes (`SDMAP`/`SDMAC`/`SDMAS`/`SDMAIO`/`SDMAM`/`SDMAON`).
//!
//! Programming is a CPU-side concern: these functions resolve the
//! instruction's operand the same way the ALU does (§4.4's "DMA-program
//! inputs" are operand-resolved, not raw decoded digits) and forward the
//! resulting value straight to [`lucario_mmu::Memory`]'s DMA-register
//! methods. The background worker that actually performs the transfer
//! lives in `lucario-dma`, a crate this one deliberately does not depend
//! on — `SDMAON` only needs `Memory::start_transfer`/`wait_for_completion`,
//! which are already bus-lock operations `Memory` exposes directly.

use lucario_core::{word_to_int, Error, Mode, Psw, Word};
use lucario_mmu::Memory;

use crate::decode::AddressingMode;
use crate::operand::resolve_operand;

fn resolve_int(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<i64, Error> {
    let value = resolve_operand(psw, mode, operand, ac, memory, rb, rl)?;
    Ok(word_to_int(value))
}

pub fn sdmap(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<(), Error> {
    let v = resolve_int(psw, mode, operand, ac, memory, rb, rl)?;
    memory.program_track(v)
}

pub fn sdmac(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<(), Error> {
    let v = resolve_int(psw, mode, operand, ac, memory, rb, rl)?;
    memory.program_cylinder(v)
}

pub fn sdmas(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<(), Error> {
    let v = resolve_int(psw, mode, operand, ac, memory, rb, rl)?;
    memory.program_sector(v)
}

pub fn sdmaio(psw: &mut Psw, mode: AddressingMode, operand: i64, ac: Word, memory: &Memory, rb: usize, rl: usize) -> Result<(), Error> {
    let v = resolve_int(psw, mode, operand, ac, memory, rb, rl)?;
    memory.program_io_direction(v)
}

pub fn sdmam(
    psw: &mut Psw,
    mode: AddressingMode,
    operand: i64,
    ac: Word,
    memory: &Memory,
    cpu_mode: Mode,
    rb: usize,
    rl: usize,
) -> Result<(), Error> {
    let v = resolve_int(psw, mode, operand, ac, memory, rb, rl)?;
    memory.program_mem_addr(v, cpu_mode, rb, rl)
}

/// `SDMAON`: mark the transfer pending, wake the worker, and block until
/// it publishes completion. This is the CPU's synchronous barrier — see
/// `lucario_mmu::Memory::wait_for_completion`.
pub fn sdmaon(memory: &Memory) {
    memory.start_transfer();
    memory.wait_for_completion();
}
