//! The DMA engine's background worker: a dedicated thread that waits on
//! the bus lock's condition variable, performs one memory<->disk transfer
//! at a time, and signals completion through the interrupt controller.
//!
//! Programming the transfer (SDMAP/SDMAC/SDMAS/SDMAIO/SDMAM/SDMAON) is a
//! CPU-side concern and lives in `lucario-cpu`, dispatching straight to
//! `lucario_mmu::Memory`'s DMA-register methods; this crate only owns the
//! worker loop and the disk it transfers into and out of.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lucario_core::{Error, InterruptCode};
use lucario_disk::Disk;
use lucario_interrupt::InterruptController;
use lucario_mmu::{DmaJob, DmaStatus, IoDirection, Memory};
use rand::Rng;

/// Lower/upper bound, in microseconds, of the simulated seek delay. Mirrors
/// the magnitude of the delay the original hardware models, not its exact
/// distribution.
const SEEK_DELAY_MIN_MICROS: u64 = 1_000;
const SEEK_DELAY_MAX_MICROS: u64 = 6_000;

/// Owns the disk and runs the DMA worker loop against a shared [`Memory`]
/// and [`InterruptController`].
pub struct DmaEngine {
    memory: Memory,
    disk: Arc<Mutex<Disk>>,
    interrupts: InterruptController,
}

impl DmaEngine {
    #[must_use]
    pub fn new(memory: Memory, interrupts: InterruptController) -> Self {
        Self {
            memory,
            disk: Arc::new(Mutex::new(Disk::new())),
            interrupts,
        }
    }

    /// A shared handle to the disk, for callers (the machine, tests) that
    /// need to inspect sector contents independent of a running transfer.
    #[must_use]
    pub fn disk(&self) -> Arc<Mutex<Disk>> {
        Arc::clone(&self.disk)
    }

    /// Spawn the worker thread. The thread runs until the process exits;
    /// the core has no documented way to tear it down short of that (see
    /// the concurrency model's cancellation notes).
    #[must_use]
    pub fn spawn_worker(&self) -> JoinHandle<()> {
        let memory = self.memory.clone();
        let disk = Arc::clone(&self.disk);
        let interrupts = self.interrupts.clone();
        thread::spawn(move || worker_loop(&memory, &disk, &interrupts))
    }
}

fn worker_loop(memory: &Memory, disk: &Mutex<Disk>, interrupts: &InterruptController) {
    loop {
        let job = memory.worker_take_job(simulate_seek);
        let result = perform_transfer(memory, disk, job);
        match result {
            Ok(()) => {
                memory.worker_finish(DmaStatus::Ok);
                interrupts.raise(InterruptCode::IoDone);
                log::info!(target: "lucario::hardware", "dma transfer complete: {job:?}");
            }
            Err(err) => {
                memory.worker_finish(DmaStatus::Error);
                interrupts.raise(InterruptCode::InvalidAddr);
                log::warn!(target: "lucario::hardware", "dma transfer failed: {err}");
            }
        }
    }
}

fn perform_transfer(memory: &Memory, disk: &Mutex<Disk>, job: DmaJob) -> Result<(), Error> {
    match job.io_direction {
        IoDirection::RamToDisk => {
            let word = memory.dma_read(job.mem_addr)?;
            disk.lock()
                .expect("disk lock poisoned")
                .write_sector(job.track, job.cylinder, job.sector, word)
        }
        IoDirection::DiskToRam => {
            let word = disk
                .lock()
                .expect("disk lock poisoned")
                .read_sector(job.track, job.cylinder, job.sector)?;
            memory.dma_write(job.mem_addr, word)
        }
    }
}

fn simulate_seek() {
    let micros = rand::rng().random_range(SEEK_DELAY_MIN_MICROS..=SEEK_DELAY_MAX_MICROS);
    thread::sleep(Duration::from_micros(micros));
}
