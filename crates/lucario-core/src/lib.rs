//! Word encoding, shared enumerations, and error types for the Lucario
//! virtual machine.
//!
//! Every other crate in the workspace depends on this one for the word
//! codec, the handful of enums shared between the CPU, the MMU, and the
//! interrupt controller, and the error type memory and instruction units
//! report back to their callers.

mod error;
mod psw;
mod word;

pub use error::Error;
pub use psw::{ConditionCode, Mode, Psw};
pub use word::{int_to_word, is_valid_word, word_to_int};

/// Number of words in RAM.
pub const RAM_SIZE: usize = 2000;
/// Words at the bottom of RAM reserved for the kernel; never inside a user
/// partition's `[RB, RL)`.
pub const OS_RESERVED_SIZE: usize = 300;

/// Disk geometry: track count.
pub const DISK_TRACKS: usize = 10;
/// Disk geometry: cylinder count.
pub const DISK_CYLINDERS: usize = 10;
/// Disk geometry: sectors per (track, cylinder).
pub const DISK_SECTORS: usize = 100;
/// Logical characters per word, as carried by the original hardware's sector
/// format. Not interpreted by this crate; kept for interface parity.
pub const SECTOR_SIZE: usize = 9;

/// The digit boundary between positive and negative words.
pub const SIGN_BIT: i64 = 10_000_000;
/// Largest representable magnitude.
pub const MAX_MAGNITUDE: i64 = 9_999_999;
/// Largest representable word value (`SIGN_BIT` plus `MAX_MAGNITUDE`).
pub const MAX_WORD_VALUE: i64 = 19_999_999;

/// Default stack allocation a freshly loaded program receives, capped by
/// available RAM.
pub const DEFAULT_STACK_SIZE: usize = 100;
/// Smallest stack a load will accept; below this the load is rejected
/// rather than silently shrunk further.
pub const MIN_STACK_SIZE: usize = 50;
/// Timer limit a freshly loaded program starts with.
pub const DEFAULT_TIMER_LIMIT: u64 = 16;

/// A machine word: a sign-magnitude integer in `[0, MAX_WORD_VALUE]`.
///
/// This is a plain `i64` alias rather than a newtype: words flow through
/// arithmetic, memory, and disk storage so constantly that a wrapper type
/// would mostly add `.0` noise. [`is_valid_word`] is the gate every write
/// path must pass through.
pub type Word = i64;

/// Interrupt codes, in the priority order the controller dispatches them.
///
/// `INVALID_INSTR` and `INVALID_ADDR` are the two "hardware" interrupts
/// that halt the CPU; everything else is handled and execution continues.
/// `Syscall` sits between the hardware-origin codes and the asynchronous
/// ones (`Timer`, `IoDone`) — see `DESIGN.md` for why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptCode {
    InvalidInstr,
    InvalidAddr,
    Overflow,
    Underflow,
    Syscall,
    Timer,
    IoDone,
    InvalidSyscall,
    InvalidIntCode,
}

impl InterruptCode {
    /// All codes, in dispatch-priority order (highest first).
    pub const PRIORITY_ORDER: [Self; 9] = [
        Self::InvalidInstr,
        Self::InvalidAddr,
        Self::Overflow,
        Self::Underflow,
        Self::Syscall,
        Self::Timer,
        Self::IoDone,
        Self::InvalidSyscall,
        Self::InvalidIntCode,
    ];

    /// Whether the controller stops the CPU after this code's handler runs.
    #[must_use]
    pub const fn halts(self) -> bool {
        matches!(self, Self::InvalidInstr | Self::InvalidAddr)
    }
}
