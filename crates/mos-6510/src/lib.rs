//! MOS 6510 CPU emulator.
//!
//! The 6510 is the C64's variant of the NMOS 6502. Its on-chip I/O port at
//! $00/$01 only matters for ROM banking and is left to the memory map.
//!
//! Execution is instruction-stepped: [`Mos6510::step`] runs one instruction
//! (or one interrupt entry sequence) and returns the cycles it took,
//! including page-crossing and branch penalties. The caller advances its
//! peripherals by that count before the next step.
//!
//! Only the 151 documented opcodes are implemented. Anything else halts the
//! CPU and is reported as [`CpuError::IllegalOpcode`].

mod addressing;
mod alu;
mod cpu;
mod error;
pub mod flags;
mod registers;

pub use addressing::Mode;
pub use cpu::{CpuState, IRQ_VECTOR, Mos6510, NMI_VECTOR, RESET_VECTOR};
pub use error::CpuError;
pub use flags::Status;
pub use registers::Registers;
