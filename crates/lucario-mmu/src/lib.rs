//! RAM, address translation, and the single bus lock shared by the CPU and
//! the DMA worker.
//!
//! The bus lock guards two things at once: the RAM array, and the DMA
//! register file (`DmaRegisters`). That pairing is deliberate — §9 of the
//! design notes this was built from calls for "a primitive that supports
//! condition-variable waits on the same lock as ordinary read/write
//! critical sections," and the DMA registers are exactly the state that
//! lock's condition variables need to observe atomically with RAM access.

mod dma_registers;

pub use dma_registers::{DmaJob, DmaRegisters, DmaStatus, IoDirection};

use std::sync::{Arc, Condvar, Mutex};

use lucario_core::{is_valid_word, word_to_int, Error, Mode, Word, DISK_CYLINDERS, DISK_SECTORS, DISK_TRACKS, RAM_SIZE};

struct BusState {
    ram: Vec<Word>,
    dma: DmaRegisters,
}

/// RAM plus the DMA register file, behind one mutex and a pair of
/// condition variables (`ready`, signaled by the CPU to wake the worker;
/// `done`, signaled by the worker to wake the CPU).
///
/// Cheap to clone — clones share the same underlying lock, which is the
/// point: the CPU control loop and the DMA worker each hold a clone.
#[derive(Clone)]
pub struct Memory {
    state: Arc<Mutex<BusState>>,
    ready: Arc<Condvar>,
    done: Arc<Condvar>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState {
                ram: vec![0; RAM_SIZE],
                dma: DmaRegisters::new(),
            })),
            ready: Arc::new(Condvar::new()),
            done: Arc::new(Condvar::new()),
        }
    }

    fn translate(mode: Mode, rb: usize, logical: i64) -> Option<usize> {
        let physical = match mode {
            Mode::Kernel => logical,
            Mode::User => logical + rb as i64,
        };
        usize::try_from(physical).ok()
    }

    fn check_protection(mode: Mode, physical: usize, rb: usize, rl: usize) -> Result<(), Error> {
        // Closed interval, matching spec.md's "[RB, RL]" invariant and the
        // original's `physAddr > CPU.RL` violation test: a loader-placed
        // program's initial SP translates to exactly RL, and the very
        // first stack access (PSH, or a JMPLT comparing M[SP] before any
        // push) must still be legal.
        if mode == Mode::User && !(rb..=rl).contains(&physical) {
            return Err(Error::ProtectionFault { addr: physical, rb, rl });
        }
        Ok(())
    }

    fn check_bounds(physical: usize) -> Result<(), Error> {
        if physical >= RAM_SIZE {
            return Err(Error::OutOfBounds(physical));
        }
        Ok(())
    }

    /// Translate `logical` under `mode` and enforce the `[rb, rl)` partition
    /// in user mode, without touching RAM. Exposed so the branching and
    /// jump units can validate a target address up front rather than
    /// relying solely on the next fetch to catch it.
    pub fn validate_address(logical: i64, mode: Mode, rb: usize, rl: usize) -> Result<usize, Error> {
        let physical = Self::translate(mode, rb, logical).ok_or(Error::OutOfBounds(0))?;
        Self::check_protection(mode, physical, rb, rl)?;
        Self::check_bounds(physical)?;
        Ok(physical)
    }

    /// Translate `logical` under `mode`, enforce the `[rb, rl)` partition in
    /// user mode, then read the resulting physical address.
    pub fn read(&self, logical: i64, mode: Mode, rb: usize, rl: usize) -> Result<Word, Error> {
        let physical = Self::validate_address(logical, mode, rb, rl)?;
        let guard = self.state.lock().expect("bus lock poisoned");
        Ok(guard.ram[physical])
    }

    /// Translate and write `word` to `logical`, same rules as [`Memory::read`].
    pub fn write(&self, logical: i64, word: Word, mode: Mode, rb: usize, rl: usize) -> Result<(), Error> {
        if !is_valid_word(word) {
            return Err(Error::InvalidData(word));
        }
        let physical = Self::validate_address(logical, mode, rb, rl)?;
        let mut guard = self.state.lock().expect("bus lock poisoned");
        guard.ram[physical] = word;
        Ok(())
    }

    /// Read a pre-validated physical address, bypassing base/limit. Used
    /// only by the DMA worker, whose addresses were already validated when
    /// the CPU programmed them.
    pub fn dma_read(&self, physical: usize) -> Result<Word, Error> {
        Self::check_bounds(physical)?;
        let guard = self.state.lock().expect("bus lock poisoned");
        Ok(guard.ram[physical])
    }

    /// Write a pre-validated physical address, bypassing base/limit.
    pub fn dma_write(&self, physical: usize, word: Word) -> Result<(), Error> {
        if !is_valid_word(word) {
            return Err(Error::InvalidData(word));
        }
        Self::check_bounds(physical)?;
        let mut guard = self.state.lock().expect("bus lock poisoned");
        guard.ram[physical] = word;
        Ok(())
    }

    // -- DMA programming opcodes (28-32); see lucario-cpu for callers --

    pub fn program_track(&self, operand: i64) -> Result<(), Error> {
        let track = usize::try_from(operand).ok().filter(|t| *t < DISK_TRACKS);
        let track = track.ok_or(Error::InvalidInstruction("SDMAP operand out of range"))?;
        self.state.lock().expect("bus lock poisoned").dma.track = track;
        Ok(())
    }

    pub fn program_cylinder(&self, operand: i64) -> Result<(), Error> {
        let cyl = usize::try_from(operand).ok().filter(|c| *c < DISK_CYLINDERS);
        let cyl = cyl.ok_or(Error::InvalidInstruction("SDMAC operand out of range"))?;
        self.state.lock().expect("bus lock poisoned").dma.cylinder = cyl;
        Ok(())
    }

    pub fn program_sector(&self, operand: i64) -> Result<(), Error> {
        let sector = usize::try_from(operand).ok().filter(|s| *s < DISK_SECTORS);
        let sector = sector.ok_or(Error::InvalidInstruction("SDMAS operand out of range"))?;
        self.state.lock().expect("bus lock poisoned").dma.sector = sector;
        Ok(())
    }

    pub fn program_io_direction(&self, operand: i64) -> Result<(), Error> {
        let direction = match operand {
            0 => IoDirection::DiskToRam,
            1 => IoDirection::RamToDisk,
            _ => return Err(Error::InvalidInstruction("SDMAIO operand must be 0 or 1")),
        };
        self.state.lock().expect("bus lock poisoned").dma.io_direction = direction;
        Ok(())
    }

    /// Program the DMA target address. In kernel mode the operand is taken
    /// literally; in user mode it is relative to `RB` and must land inside
    /// `[RB, RL]`, then inside `[0, RAM_SIZE)`.
    pub fn program_mem_addr(&self, operand: i64, mode: Mode, rb: usize, rl: usize) -> Result<(), Error> {
        let addr = match mode {
            Mode::Kernel => operand,
            Mode::User => operand + rb as i64,
        };
        let addr = usize::try_from(addr).map_err(|_| Error::ProtectionFault { addr: 0, rb, rl })?;
        if mode == Mode::User && !(rb..=rl).contains(&addr) {
            return Err(Error::ProtectionFault { addr, rb, rl });
        }
        if addr >= RAM_SIZE {
            return Err(Error::OutOfBounds(addr));
        }
        self.state.lock().expect("bus lock poisoned").dma.mem_addr = addr;
        Ok(())
    }

    /// SDMAON: mark the transfer pending and wake the worker.
    pub fn start_transfer(&self) {
        let mut guard = self.state.lock().expect("bus lock poisoned");
        guard.dma.pending = true;
        drop(guard);
        self.ready.notify_all();
    }

    /// The CPU's synchronous barrier: block until the worker clears
    /// `pending`. Waits on the `done` condition variable rather than
    /// spin-sleeping, per the preferred redesign.
    pub fn wait_for_completion(&self) {
        let guard = self.state.lock().expect("bus lock poisoned");
        drop(
            self.done
                .wait_while(guard, |s| s.dma.pending)
                .expect("bus lock poisoned"),
        );
    }

    /// The worker's half: block until a request is pending, then mark the
    /// transfer active and return a snapshot of the geometry to act on.
    /// `during_wait` runs with the bus lock still held, immediately after
    /// the request is observed — used for the simulated seek delay, which
    /// the original hardware likewise performs before releasing the bus.
    pub fn worker_take_job(&self, during_wait: impl FnOnce()) -> DmaJob {
        let mut guard = self
            .ready
            .wait_while(self.state.lock().expect("bus lock poisoned"), |s| !s.dma.pending)
            .expect("bus lock poisoned");
        guard.dma.active = true;
        guard.dma.status = DmaStatus::Ok;
        let job = DmaJob::from(&guard.dma);
        during_wait();
        job
    }

    /// The worker's completion step: publish `status`, clear
    /// `active`/`pending`, and wake the CPU.
    pub fn worker_finish(&self, status: DmaStatus) {
        let mut guard = self.state.lock().expect("bus lock poisoned");
        guard.dma.status = status;
        guard.dma.active = false;
        guard.dma.pending = false;
        drop(guard);
        self.done.notify_all();
    }

    /// A consistent snapshot of the DMA register file, for introspection
    /// (tests, the machine's status reporting).
    #[must_use]
    pub fn dma_snapshot(&self) -> DmaRegisters {
        self.state.lock().expect("bus lock poisoned").dma
    }

    /// Clear the DMA register file. Per the reset contract, this must not
    /// be called while a transfer is active.
    pub fn reset_dma_registers(&self) {
        self.state.lock().expect("bus lock poisoned").dma = DmaRegisters::new();
    }
}

/// Signed word helper used by callers resolving Indexed-mode addresses:
/// combines a (possibly negative) base operand with the signed value of
/// AC, the way the Operand Resolver's effective-address rule requires.
#[must_use]
pub fn indexed_address(operand: i64, ac_word: Word) -> i64 {
    operand + word_to_int(ac_word)
}
