/// Errors produced by the memory, disk, and instruction-execution units.
///
/// This is the single error type shared across the workspace's core
/// crates; the CPU control loop converts every variant into an interrupt
/// rather than propagating it to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("physical address {0} is out of bounds")]
    OutOfBounds(usize),
    #[error("user-mode access to address {addr} violates partition [{rb}, {rl})")]
    ProtectionFault { addr: usize, rb: usize, rl: usize },
    #[error("word {0} violates the word encoding")]
    InvalidData(i64),
    #[error("invalid instruction: {0}")]
    InvalidInstruction(&'static str),
    #[error("effective address does not resolve to a readable location")]
    InvalidAddress,
}
