//! The CPU's register file.

use lucario_core::{Psw, Word};

/// Register file (CPU context).
///
/// `RB`/`RL`/`RX`/`SP` are logical offsets in the same coordinate space the
/// MMU translates — a user-mode program's `RB`-relative view of its own
/// partition, not raw physical addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub ac: Word,
    pub mar: Word,
    pub mdr: Word,
    pub ir: Word,
    pub rb: usize,
    pub rl: usize,
    pub rx: usize,
    pub sp: usize,
    pub psw: Psw,
    pub timer_limit: u64,
    pub cycles_counter: u64,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ac: 0,
            mar: 0,
            mdr: 0,
            ir: 0,
            rb: 0,
            rl: 0,
            rx: 0,
            sp: 0,
            psw: Psw::new(),
            timer_limit: 0,
            cycles_counter: 0,
        }
    }
}
