//! The composition root: owns the CPU, the shared bus, the interrupt
//! controller, and the DMA engine, and wires them into a runnable machine.
//!
//! Corresponds to `examples/original_source/src/main.c`'s boot sequence
//! (`memoryInit`, `diskInit`, spawning the DMA thread, then handing
//! control to the CPU loop) and to how `examples/emu198x-emu198x`'s
//! `machine-*` crates compose a CPU crate with a memory/bus crate and a
//! runner loop.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use lucario_cpu::{Cpu, HaltReason, StepOutcome};
use lucario_disk::Disk;
use lucario_dma::DmaEngine;
use lucario_interrupt::InterruptController;
use lucario_loader::{LoadError, ParsedProgram};
use lucario_mmu::Memory;

/// Errors a caller of the composition root can hit that don't belong to
/// any single subsystem.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("cannot reset while a DMA transfer is active")]
    DmaActive,
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A fully wired Lucario machine: CPU, shared bus, interrupt controller,
/// and a DMA worker thread running in the background for the lifetime of
/// the process — see the concurrency model's lifecycle notes, which name
/// this as the one documented way the worker is ever created.
pub struct Machine {
    cpu: Cpu,
    memory: Memory,
    interrupts: InterruptController,
    dma: DmaEngine,
    _worker: JoinHandle<()>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    #[must_use]
    pub fn new() -> Self {
        let memory = Memory::new();
        let interrupts = InterruptController::new();
        let dma = DmaEngine::new(memory.clone(), interrupts.clone());
        let worker = dma.spawn_worker();

        Self {
            cpu: Cpu::new(),
            memory,
            interrupts,
            dma,
            _worker: worker,
        }
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    /// A shared handle to the disk, for inspecting sector contents
    /// independent of a running transfer.
    #[must_use]
    pub fn disk(&self) -> Arc<Mutex<Disk>> {
        self.dma.disk()
    }

    /// Parse and install a program image, setting up the CPU's initial
    /// context per the loader contract.
    pub fn load_program(&mut self, path: &Path) -> Result<ParsedProgram, MachineError> {
        lucario_loader::load_program_file(path, &self.memory, &mut self.cpu).map_err(Into::into)
    }

    /// One fetch/decode/execute/tick/service cycle.
    pub fn step(&mut self) -> StepOutcome {
        self.cpu.step(&self.memory, &self.interrupts)
    }

    /// Run until the CPU halts.
    pub fn run(&mut self) -> HaltReason {
        self.cpu.run(&self.memory, &self.interrupts)
    }

    /// Clear the register file, the interrupt bitmap, and the DMA register
    /// file. RAM and the disk are left untouched — only the loader
    /// overwrites program regions. Refuses while a DMA transfer is active,
    /// per the concurrency model's cancellation notes.
    pub fn reset(&mut self) -> Result<(), MachineError> {
        if self.memory.dma_snapshot().active {
            return Err(MachineError::DmaActive);
        }
        self.cpu.reset();
        self.interrupts.reset();
        self.memory.reset_dma_registers();
        Ok(())
    }
}
