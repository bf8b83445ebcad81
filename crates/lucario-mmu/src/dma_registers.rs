//! DMA register file. Lives behind the same bus lock as RAM — see
//! `Memory`'s module doc for why.

/// The direction a programmed transfer moves words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    DiskToRam,
    RamToDisk,
}

/// Outcome of the most recently completed (or in-flight) transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaStatus {
    Ok,
    Error,
}

/// The DMA controller's programmable state: geometry, direction, target
/// address, and the status/active/pending flags the CPU and the worker
/// thread coordinate through.
#[derive(Debug, Clone, Copy)]
pub struct DmaRegisters {
    pub track: usize,
    pub cylinder: usize,
    pub sector: usize,
    pub io_direction: IoDirection,
    pub mem_addr: usize,
    pub status: DmaStatus,
    pub active: bool,
    pub pending: bool,
}

impl Default for DmaRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaRegisters {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            track: 0,
            cylinder: 0,
            sector: 0,
            io_direction: IoDirection::DiskToRam,
            mem_addr: 0,
            status: DmaStatus::Ok,
            active: false,
            pending: false,
        }
    }
}

/// A snapshot of the geometry and direction the worker needs to perform one
/// transfer, taken at the moment the worker picks up a pending request.
#[derive(Debug, Clone, Copy)]
pub struct DmaJob {
    pub track: usize,
    pub cylinder: usize,
    pub sector: usize,
    pub io_direction: IoDirection,
    pub mem_addr: usize,
}

impl From<&DmaRegisters> for DmaJob {
    fn from(regs: &DmaRegisters) -> Self {
        Self {
            track: regs.track,
            cylinder: regs.cylinder,
            sector: regs.sector,
            io_direction: regs.io_direction,
            mem_addr: regs.mem_addr,
        }
    }
}
