//! Core traits and types for cycle-counted emulation.
//!
//! Every component advances in CPU cycles. The CPU reports how many cycles
//! each instruction consumed and the machine advances its peripherals by
//! exactly that many.

mod bus;
mod clock;
mod cpu;
mod observable;
mod tickable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
