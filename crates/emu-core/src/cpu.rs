//! CPU core trait.

use crate::Bus;

/// A CPU core that executes whole instructions.
///
/// The bus is passed in, not owned, so the machine can hand the same bus to
/// its peripherals between instructions.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Error reported at an instruction boundary.
    type Error;

    /// Execute one instruction (or one interrupt entry sequence) and return
    /// the number of cycles it consumed.
    fn step<B: Bus>(&mut self, bus: &mut B) -> Result<u32, Self::Error>;

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Drive the level-sensitive IRQ input.
    fn set_irq(&mut self, asserted: bool);

    /// Request a non-maskable interrupt (edge).
    fn nmi(&mut self);

    /// Reset the CPU to its initial state, loading PC from the reset vector.
    fn reset<B: Bus>(&mut self, bus: &mut B);
}
