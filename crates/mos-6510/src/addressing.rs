//! 6510 addressing modes.
//!
//! Operand-bearing modes resolve to an effective address through
//! [`Mos6510::effective_address`]:
//! - Immediate: #$nn (the operand byte itself, addressed at PC)
//! - Zero Page: $nn (8-bit address in page zero)
//! - Zero Page,X / Zero Page,Y: wraps within page zero
//! - Absolute: $nnnn
//! - Absolute,X / Absolute,Y: may cross a page (one extra cycle on reads)
//! - Indexed Indirect: ($nn,X) (pointer in zero page indexed by X)
//! - Indirect Indexed: ($nn),Y (zero page pointer + Y, may cross a page)
//!
//! Implied, accumulator, relative (branches) and indirect (JMP only) are
//! handled by the instructions that use them.

use emu_core::Bus;

use crate::Mos6510;

/// Operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndexedIndirect,
    IndirectIndexed,
}

impl Mode {
    /// Base cycles for a read instruction (LDA, ADC, CMP, ...).
    /// Indexed modes add one more when the index crosses a page.
    #[must_use]
    pub const fn read_cycles(self) -> u32 {
        match self {
            Mode::Immediate => 2,
            Mode::ZeroPage => 3,
            Mode::ZeroPageX | Mode::ZeroPageY => 4,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY => 4,
            Mode::IndexedIndirect => 6,
            Mode::IndirectIndexed => 5,
        }
    }

    /// Cycles for a store. Stores always pay for the index fix-up.
    #[must_use]
    pub const fn store_cycles(self) -> u32 {
        match self {
            Mode::Immediate => 2,
            Mode::ZeroPage => 3,
            Mode::ZeroPageX | Mode::ZeroPageY | Mode::Absolute => 4,
            Mode::AbsoluteX | Mode::AbsoluteY => 5,
            Mode::IndexedIndirect | Mode::IndirectIndexed => 6,
        }
    }

    /// Cycles for a read-modify-write instruction (ASL, INC, ...).
    #[must_use]
    pub const fn modify_cycles(self) -> u32 {
        match self {
            Mode::ZeroPage => 5,
            Mode::ZeroPageX | Mode::Absolute => 6,
            Mode::AbsoluteX | Mode::AbsoluteY => 7,
            Mode::IndexedIndirect | Mode::IndirectIndexed => 8,
            // No documented RMW opcode uses these.
            Mode::Immediate | Mode::ZeroPageY => 2,
        }
    }
}

impl Mos6510 {
    /// Fetch the next byte at PC and increment PC.
    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Fetch a 16-bit word (little-endian) at PC.
    pub(crate) fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a 16-bit word from memory (little-endian).
    pub(crate) fn read_word<B: Bus>(bus: &mut B, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Read a pointer from zero page. The high byte wraps within page zero.
    fn read_zero_page_word<B: Bus>(bus: &mut B, ptr: u8) -> u16 {
        let low = bus.read(u16::from(ptr));
        let high = bus.read(u16::from(ptr.wrapping_add(1)));
        u16::from_le_bytes([low, high])
    }

    /// Read a 16-bit word with the page boundary bug (indirect JMP).
    /// If addr is $xxFF, the high byte comes from $xx00.
    pub(crate) fn read_word_page_bug<B: Bus>(bus: &mut B, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    /// Push a byte onto the stack.
    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    /// Pull a byte from the stack.
    pub(crate) fn pull<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let addr = self.regs.pop();
        bus.read(addr)
    }

    /// Push a 16-bit word onto the stack (high byte first).
    pub(crate) fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.push(bus, high);
        self.push(bus, low);
    }

    /// Pull a 16-bit word from the stack (low byte first).
    pub(crate) fn pull_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    /// Resolve the operand's effective address, advancing PC past it.
    ///
    /// Returns `(address, page_crossed)`. Only absolute-indexed and
    /// indirect-indexed modes can report a page crossing.
    pub(crate) fn effective_address<B: Bus>(&mut self, bus: &mut B, mode: Mode) -> (u16, bool) {
        match mode {
            Mode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                (addr, false)
            }
            Mode::ZeroPage => (u16::from(self.fetch(bus)), false),
            Mode::ZeroPageX => (u16::from(self.fetch(bus).wrapping_add(self.regs.x)), false),
            Mode::ZeroPageY => (u16::from(self.fetch(bus).wrapping_add(self.regs.y)), false),
            Mode::Absolute => (self.fetch_word(bus), false),
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.x));
                (addr, base & 0xFF00 != addr & 0xFF00)
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                (addr, base & 0xFF00 != addr & 0xFF00)
            }
            Mode::IndexedIndirect => {
                let ptr = self.fetch(bus).wrapping_add(self.regs.x);
                (Self::read_zero_page_word(bus, ptr), false)
            }
            Mode::IndirectIndexed => {
                let ptr = self.fetch(bus);
                let base = Self::read_zero_page_word(bus, ptr);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                (addr, base & 0xFF00 != addr & 0xFF00)
            }
        }
    }

    /// Relative branch. Returns the cycle cost: 2 when not taken, 3 when
    /// taken, 4 when taken across a page.
    pub(crate) fn branch<B: Bus>(&mut self, bus: &mut B, condition: bool) -> u32 {
        let offset = self.fetch(bus) as i8;
        if !condition {
            return 2;
        }
        let target = self.regs.pc.wrapping_add(offset as u16);
        let page_crossed = self.regs.pc & 0xFF00 != target & 0xFF00;
        self.regs.pc = target;
        if page_crossed { 4 } else { 3 }
    }
}
