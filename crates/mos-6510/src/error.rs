//! CPU error reporting.

use thiserror::Error;

/// Conditions reported by [`crate::Mos6510::step`] at an instruction
/// boundary. Registers and memory are left exactly as they were before the
/// failing fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    /// The byte at `address` is not a documented instruction. The CPU is now
    /// halted with PC pointing at it.
    #[error("illegal opcode ${opcode:02X} at ${address:04X}")]
    IllegalOpcode { opcode: u8, address: u16 },

    /// The CPU halted earlier and stays halted until reset.
    #[error("CPU halted at ${address:04X}")]
    Halted { address: u16 },
}
