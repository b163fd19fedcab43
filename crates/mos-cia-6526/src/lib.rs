//! MOS 6526 Complex Interface Adapter.
//!
//! Only the parts a sound player depends on are modelled: the two interval
//! timers, their interrupt control register and the port latches. TOD clock
//! and serial shift register read as zero.
//!
//! # Registers
//!
//! | Reg | Read                | Write                 |
//! |-----|---------------------|-----------------------|
//! | $0  | Port A data         | Port A data           |
//! | $1  | Port B data         | Port B data           |
//! | $2  | Port A DDR          | Port A DDR            |
//! | $3  | Port B DDR          | Port B DDR            |
//! | $4  | Timer A low (cnt)   | Timer A low (latch)   |
//! | $5  | Timer A high (cnt)  | Timer A high (latch)  |
//! | $6  | Timer B low (cnt)   | Timer B low (latch)   |
//! | $7  | Timer B high (cnt)  | Timer B high (latch)  |
//! | $8-$B | TOD (zero)        | ignored               |
//! | $C  | Serial (zero)       | ignored               |
//! | $D  | ICR (read/clear)    | ICR mask (set/clear)  |
//! | $E  | Control A           | Control A             |
//! | $F  | Control B           | Control B             |

mod timer;

use emu_core::{Observable, Tickable, Value};

pub use timer::{CountSource, Timer, TimerControl, TimerId};

/// Control register bit constants.
pub mod control {
    pub use crate::timer::{FORCE_LOAD, ONE_SHOT, PB_ON, START, TOGGLE};
}

/// ICR bit for Timer A underflow.
pub const ICR_TIMER_A: u8 = 0x01;
/// ICR bit for Timer B underflow.
pub const ICR_TIMER_B: u8 = 0x02;
/// ICR read: any enabled source active. ICR write: set (1) or clear (0).
pub const ICR_SET_CLEAR: u8 = 0x80;

/// CIA 6526 instance.
#[derive(Debug, Clone)]
pub struct Cia {
    port_a: u8,
    port_b: u8,
    ddr_a: u8,
    ddr_b: u8,
    timer_a: Timer,
    timer_b: Timer,
    /// ICR mask bits for sources other than the timers (bits 2-4).
    other_mask: u8,
}

impl Default for Cia {
    fn default() -> Self {
        Self::new()
    }
}

impl Cia {
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_a: 0xFF,
            port_b: 0xFF,
            ddr_a: 0,
            ddr_b: 0,
            timer_a: Timer::new(TimerId::A),
            timer_b: Timer::new(TimerId::B),
            other_mask: 0,
        }
    }

    #[must_use]
    pub fn timer_a(&self) -> &Timer {
        &self.timer_a
    }

    #[must_use]
    pub fn timer_b(&self) -> &Timer {
        &self.timer_b
    }

    /// Raw ICR status bits (0-4), without the summary bit.
    #[must_use]
    pub fn icr_status(&self) -> u8 {
        u8::from(self.timer_a.underflowed()) | (u8::from(self.timer_b.underflowed()) << 1)
    }

    /// ICR mask bits (0-4).
    #[must_use]
    pub fn icr_mask(&self) -> u8 {
        u8::from(self.timer_a.interrupt_enable())
            | (u8::from(self.timer_b.interrupt_enable()) << 1)
            | self.other_mask
    }

    /// Interrupt output: any status bit with its mask bit set.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.timer_a.irq_requested() || self.timer_b.irq_requested()
    }

    fn icr_value(&self) -> u8 {
        let summary = if self.irq_active() { ICR_SET_CLEAR } else { 0 };
        self.icr_status() | summary
    }

    /// Read a register. Reading the ICR acknowledges every pending source.
    pub fn read(&mut self, reg: u8) -> u8 {
        if reg & 0x0F == 0x0D {
            let value = self.icr_value();
            self.timer_a.acknowledge();
            self.timer_b.acknowledge();
            return value;
        }
        self.peek(reg)
    }

    /// Read a register without side effects.
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        match reg & 0x0F {
            0x00 => (self.port_a & self.ddr_a) | !self.ddr_a,
            0x01 => (self.port_b & self.ddr_b) | !self.ddr_b,
            0x02 => self.ddr_a,
            0x03 => self.ddr_b,
            0x04 => self.timer_a.counter() as u8,
            0x05 => (self.timer_a.counter() >> 8) as u8,
            0x06 => self.timer_b.counter() as u8,
            0x07 => (self.timer_b.counter() >> 8) as u8,
            0x0D => self.icr_value(),
            0x0E => self.timer_a.control_byte(),
            0x0F => self.timer_b.control_byte(),
            // TOD and serial shift register
            _ => 0,
        }
    }

    /// Write a register.
    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x0F {
            0x00 => self.port_a = value,
            0x01 => self.port_b = value,
            0x02 => self.ddr_a = value,
            0x03 => self.ddr_b = value,
            0x04 => self.timer_a.write_latch_lo(value),
            0x05 => self.timer_a.write_latch_hi(value),
            0x06 => self.timer_b.write_latch_lo(value),
            0x07 => self.timer_b.write_latch_hi(value),
            0x0D => {
                let set = value & ICR_SET_CLEAR != 0;
                if value & ICR_TIMER_A != 0 {
                    self.timer_a.set_interrupt_enable(set);
                }
                if value & ICR_TIMER_B != 0 {
                    self.timer_b.set_interrupt_enable(set);
                }
                let others = value & 0x1C;
                if set {
                    self.other_mask |= others;
                } else {
                    self.other_mask &= !others;
                }
            }
            0x0E => self.timer_a.write_control(value),
            0x0F => self.timer_b.write_control(value),
            _ => {}
        }
    }
}

impl Tickable for Cia {
    /// One system clock cycle. Timer B sees Timer A's underflow from the
    /// same cycle when cascaded.
    fn tick(&mut self) {
        let a_underflow = self.timer_a.tick();
        self.timer_b.tick();
        if a_underflow {
            self.timer_b.cascade();
        }
    }
}

impl Observable for Cia {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "timer_a.counter" => Some(self.timer_a.counter().into()),
            "timer_a.latch" => Some(self.timer_a.latch().into()),
            "timer_a.running" => Some(self.timer_a.control().start.into()),
            "timer_b.counter" => Some(self.timer_b.counter().into()),
            "timer_b.latch" => Some(self.timer_b.latch().into()),
            "timer_b.running" => Some(self.timer_b.control().start.into()),
            "icr.status" => Some(self.icr_status().into()),
            "icr.mask" => Some(self.icr_mask().into()),
            "irq" => Some(self.irq_active().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "timer_a.counter",
            "timer_a.latch",
            "timer_a.running",
            "timer_b.counter",
            "timer_b.latch",
            "timer_b.running",
            "icr.status",
            "icr.mask",
            "irq",
        ]
    }
}
