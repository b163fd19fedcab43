//! 6510 CPU implementation.
//!
//! Each `step()` performs one whole instruction against the bus and reports
//! the cycles it consumed. Interrupts are sampled at instruction boundaries:
//! a pending NMI always wins, then IRQ if the I flag is clear.

use emu_core::{Bus, Cpu, Observable, Value};
use log::warn;

use crate::addressing::Mode;
use crate::flags::{B, C, D, I, N, V, Z};
use crate::{CpuError, Registers};

/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address. BRK shares it with IRQ on the real part.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles for any interrupt entry sequence (IRQ, NMI or BRK).
const INTERRUPT_CYCLES: u32 = 7;

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// Fetching and executing instructions.
    Running,
    /// Inside an interrupt handler (until the matching RTI).
    ServicingInterrupt,
    /// Stopped on an illegal opcode. Terminal until `reset()`.
    Halted,
}

/// The MOS 6510 CPU.
#[derive(Debug)]
pub struct Mos6510 {
    /// CPU registers.
    pub regs: Registers,

    /// Current execution state.
    state: CpuState,

    /// Nesting depth of interrupt handlers entered but not yet returned.
    interrupt_depth: u8,

    /// NMI edge latch.
    nmi_pending: bool,

    /// IRQ input level (true = asserted).
    irq_line: bool,

    /// Total cycles executed.
    total_cycles: u64,
}

impl Default for Mos6510 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6510 {
    /// Create a new CPU in power-on state. PC is 0 until `reset()` or an
    /// explicit entry point is set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            state: CpuState::Running,
            interrupt_depth: 0,
            nmi_pending: false,
            irq_line: false,
            total_cycles: 0,
        }
    }

    /// Current execution state.
    #[must_use]
    pub fn state(&self) -> CpuState {
        self.state
    }

    /// Total cycles consumed since creation.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Set the program counter (entry point for a loaded image).
    pub fn set_pc(&mut self, pc: u16) {
        self.regs.pc = pc;
    }

    /// Execute one instruction or interrupt entry.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError::IllegalOpcode`] the first time an undocumented
    /// opcode is fetched and [`CpuError::Halted`] on every step after that.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<u32, CpuError> {
        if self.state == CpuState::Halted {
            return Err(CpuError::Halted {
                address: self.regs.pc,
            });
        }

        if self.nmi_pending {
            self.nmi_pending = false;
            let cycles = self.enter_interrupt(bus, NMI_VECTOR, false);
            return Ok(self.account(cycles));
        }
        if self.irq_line && !self.regs.p.is_set(I) {
            let cycles = self.enter_interrupt(bus, IRQ_VECTOR, false);
            return Ok(self.account(cycles));
        }

        let address = self.regs.pc;
        let opcode = self.fetch(bus);
        if let Some(cycles) = self.execute(bus, opcode) {
            Ok(self.account(cycles))
        } else {
            self.regs.pc = address;
            self.state = CpuState::Halted;
            warn!("illegal opcode ${opcode:02X} at ${address:04X}, CPU halted");
            Err(CpuError::IllegalOpcode { opcode, address })
        }
    }

    fn account(&mut self, cycles: u32) -> u32 {
        self.total_cycles += u64::from(cycles);
        cycles
    }

    /// Push PC and status, set I, load PC from `vector`.
    fn enter_interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16, brk: bool) -> u32 {
        self.push_word(bus, self.regs.pc);
        let status = if brk {
            self.regs.p.to_byte_brk()
        } else {
            self.regs.p.to_byte_irq()
        };
        self.push(bus, status);
        self.regs.p.set(I);
        self.regs.pc = Self::read_word(bus, vector);
        self.interrupt_depth = self.interrupt_depth.saturating_add(1);
        self.state = CpuState::ServicingInterrupt;
        INTERRUPT_CYCLES
    }

    /// Read an operand and apply `op` to it.
    fn read_op<B: Bus>(&mut self, bus: &mut B, mode: Mode, op: fn(&mut Self, u8)) -> u32 {
        let (addr, page_crossed) = self.effective_address(bus, mode);
        let value = bus.read(addr);
        op(self, value);
        mode.read_cycles() + u32::from(page_crossed)
    }

    /// Store `value` at the operand address.
    fn store_op<B: Bus>(&mut self, bus: &mut B, mode: Mode, value: u8) -> u32 {
        let (addr, _) = self.effective_address(bus, mode);
        bus.write(addr, value);
        mode.store_cycles()
    }

    /// Read-modify-write. The unmodified value is written back first, as
    /// the real part does; I/O registers see both writes.
    fn modify_op<B: Bus>(&mut self, bus: &mut B, mode: Mode, op: fn(&mut Self, u8) -> u8) -> u32 {
        let (addr, _) = self.effective_address(bus, mode);
        let value = bus.read(addr);
        bus.write(addr, value);
        let result = op(self, value);
        bus.write(addr, result);
        mode.modify_cycles()
    }

    /// Accumulator-mode shift/rotate.
    fn accumulator_op(&mut self, op: fn(&mut Self, u8) -> u8) -> u32 {
        let value = self.regs.a;
        self.regs.a = op(self, value);
        2
    }

    /// Two-cycle implied instruction.
    fn implied(&mut self, f: impl FnOnce(&mut Registers)) -> u32 {
        f(&mut self.regs);
        2
    }

    /// Execute one decoded opcode. Returns `None` for illegal opcodes.
    #[allow(clippy::too_many_lines)]
    fn execute<B: Bus>(&mut self, bus: &mut B, opcode: u8) -> Option<u32> {
        let cycles = match opcode {
            // LDA
            0xA9 => self.read_op(bus, Mode::Immediate, Self::lda),
            0xA5 => self.read_op(bus, Mode::ZeroPage, Self::lda),
            0xB5 => self.read_op(bus, Mode::ZeroPageX, Self::lda),
            0xAD => self.read_op(bus, Mode::Absolute, Self::lda),
            0xBD => self.read_op(bus, Mode::AbsoluteX, Self::lda),
            0xB9 => self.read_op(bus, Mode::AbsoluteY, Self::lda),
            0xA1 => self.read_op(bus, Mode::IndexedIndirect, Self::lda),
            0xB1 => self.read_op(bus, Mode::IndirectIndexed, Self::lda),

            // LDX
            0xA2 => self.read_op(bus, Mode::Immediate, Self::ldx),
            0xA6 => self.read_op(bus, Mode::ZeroPage, Self::ldx),
            0xB6 => self.read_op(bus, Mode::ZeroPageY, Self::ldx),
            0xAE => self.read_op(bus, Mode::Absolute, Self::ldx),
            0xBE => self.read_op(bus, Mode::AbsoluteY, Self::ldx),

            // LDY
            0xA0 => self.read_op(bus, Mode::Immediate, Self::ldy),
            0xA4 => self.read_op(bus, Mode::ZeroPage, Self::ldy),
            0xB4 => self.read_op(bus, Mode::ZeroPageX, Self::ldy),
            0xAC => self.read_op(bus, Mode::Absolute, Self::ldy),
            0xBC => self.read_op(bus, Mode::AbsoluteX, Self::ldy),

            // STA
            0x85 => self.store_op(bus, Mode::ZeroPage, self.regs.a),
            0x95 => self.store_op(bus, Mode::ZeroPageX, self.regs.a),
            0x8D => self.store_op(bus, Mode::Absolute, self.regs.a),
            0x9D => self.store_op(bus, Mode::AbsoluteX, self.regs.a),
            0x99 => self.store_op(bus, Mode::AbsoluteY, self.regs.a),
            0x81 => self.store_op(bus, Mode::IndexedIndirect, self.regs.a),
            0x91 => self.store_op(bus, Mode::IndirectIndexed, self.regs.a),

            // STX / STY
            0x86 => self.store_op(bus, Mode::ZeroPage, self.regs.x),
            0x96 => self.store_op(bus, Mode::ZeroPageY, self.regs.x),
            0x8E => self.store_op(bus, Mode::Absolute, self.regs.x),
            0x84 => self.store_op(bus, Mode::ZeroPage, self.regs.y),
            0x94 => self.store_op(bus, Mode::ZeroPageX, self.regs.y),
            0x8C => self.store_op(bus, Mode::Absolute, self.regs.y),

            // ORA
            0x09 => self.read_op(bus, Mode::Immediate, Self::ora),
            0x05 => self.read_op(bus, Mode::ZeroPage, Self::ora),
            0x15 => self.read_op(bus, Mode::ZeroPageX, Self::ora),
            0x0D => self.read_op(bus, Mode::Absolute, Self::ora),
            0x1D => self.read_op(bus, Mode::AbsoluteX, Self::ora),
            0x19 => self.read_op(bus, Mode::AbsoluteY, Self::ora),
            0x01 => self.read_op(bus, Mode::IndexedIndirect, Self::ora),
            0x11 => self.read_op(bus, Mode::IndirectIndexed, Self::ora),

            // AND
            0x29 => self.read_op(bus, Mode::Immediate, Self::and),
            0x25 => self.read_op(bus, Mode::ZeroPage, Self::and),
            0x35 => self.read_op(bus, Mode::ZeroPageX, Self::and),
            0x2D => self.read_op(bus, Mode::Absolute, Self::and),
            0x3D => self.read_op(bus, Mode::AbsoluteX, Self::and),
            0x39 => self.read_op(bus, Mode::AbsoluteY, Self::and),
            0x21 => self.read_op(bus, Mode::IndexedIndirect, Self::and),
            0x31 => self.read_op(bus, Mode::IndirectIndexed, Self::and),

            // EOR
            0x49 => self.read_op(bus, Mode::Immediate, Self::eor),
            0x45 => self.read_op(bus, Mode::ZeroPage, Self::eor),
            0x55 => self.read_op(bus, Mode::ZeroPageX, Self::eor),
            0x4D => self.read_op(bus, Mode::Absolute, Self::eor),
            0x5D => self.read_op(bus, Mode::AbsoluteX, Self::eor),
            0x59 => self.read_op(bus, Mode::AbsoluteY, Self::eor),
            0x41 => self.read_op(bus, Mode::IndexedIndirect, Self::eor),
            0x51 => self.read_op(bus, Mode::IndirectIndexed, Self::eor),

            // ADC
            0x69 => self.read_op(bus, Mode::Immediate, Self::adc),
            0x65 => self.read_op(bus, Mode::ZeroPage, Self::adc),
            0x75 => self.read_op(bus, Mode::ZeroPageX, Self::adc),
            0x6D => self.read_op(bus, Mode::Absolute, Self::adc),
            0x7D => self.read_op(bus, Mode::AbsoluteX, Self::adc),
            0x79 => self.read_op(bus, Mode::AbsoluteY, Self::adc),
            0x61 => self.read_op(bus, Mode::IndexedIndirect, Self::adc),
            0x71 => self.read_op(bus, Mode::IndirectIndexed, Self::adc),

            // SBC
            0xE9 => self.read_op(bus, Mode::Immediate, Self::sbc),
            0xE5 => self.read_op(bus, Mode::ZeroPage, Self::sbc),
            0xF5 => self.read_op(bus, Mode::ZeroPageX, Self::sbc),
            0xED => self.read_op(bus, Mode::Absolute, Self::sbc),
            0xFD => self.read_op(bus, Mode::AbsoluteX, Self::sbc),
            0xF9 => self.read_op(bus, Mode::AbsoluteY, Self::sbc),
            0xE1 => self.read_op(bus, Mode::IndexedIndirect, Self::sbc),
            0xF1 => self.read_op(bus, Mode::IndirectIndexed, Self::sbc),

            // CMP
            0xC9 => self.read_op(bus, Mode::Immediate, Self::cmp),
            0xC5 => self.read_op(bus, Mode::ZeroPage, Self::cmp),
            0xD5 => self.read_op(bus, Mode::ZeroPageX, Self::cmp),
            0xCD => self.read_op(bus, Mode::Absolute, Self::cmp),
            0xDD => self.read_op(bus, Mode::AbsoluteX, Self::cmp),
            0xD9 => self.read_op(bus, Mode::AbsoluteY, Self::cmp),
            0xC1 => self.read_op(bus, Mode::IndexedIndirect, Self::cmp),
            0xD1 => self.read_op(bus, Mode::IndirectIndexed, Self::cmp),

            // CPX / CPY
            0xE0 => self.read_op(bus, Mode::Immediate, Self::cpx),
            0xE4 => self.read_op(bus, Mode::ZeroPage, Self::cpx),
            0xEC => self.read_op(bus, Mode::Absolute, Self::cpx),
            0xC0 => self.read_op(bus, Mode::Immediate, Self::cpy),
            0xC4 => self.read_op(bus, Mode::ZeroPage, Self::cpy),
            0xCC => self.read_op(bus, Mode::Absolute, Self::cpy),

            // BIT
            0x24 => self.read_op(bus, Mode::ZeroPage, Self::bit),
            0x2C => self.read_op(bus, Mode::Absolute, Self::bit),

            // ASL
            0x0A => self.accumulator_op(Self::asl),
            0x06 => self.modify_op(bus, Mode::ZeroPage, Self::asl),
            0x16 => self.modify_op(bus, Mode::ZeroPageX, Self::asl),
            0x0E => self.modify_op(bus, Mode::Absolute, Self::asl),
            0x1E => self.modify_op(bus, Mode::AbsoluteX, Self::asl),

            // LSR
            0x4A => self.accumulator_op(Self::lsr),
            0x46 => self.modify_op(bus, Mode::ZeroPage, Self::lsr),
            0x56 => self.modify_op(bus, Mode::ZeroPageX, Self::lsr),
            0x4E => self.modify_op(bus, Mode::Absolute, Self::lsr),
            0x5E => self.modify_op(bus, Mode::AbsoluteX, Self::lsr),

            // ROL
            0x2A => self.accumulator_op(Self::rol),
            0x26 => self.modify_op(bus, Mode::ZeroPage, Self::rol),
            0x36 => self.modify_op(bus, Mode::ZeroPageX, Self::rol),
            0x2E => self.modify_op(bus, Mode::Absolute, Self::rol),
            0x3E => self.modify_op(bus, Mode::AbsoluteX, Self::rol),

            // ROR
            0x6A => self.accumulator_op(Self::ror),
            0x66 => self.modify_op(bus, Mode::ZeroPage, Self::ror),
            0x76 => self.modify_op(bus, Mode::ZeroPageX, Self::ror),
            0x6E => self.modify_op(bus, Mode::Absolute, Self::ror),
            0x7E => self.modify_op(bus, Mode::AbsoluteX, Self::ror),

            // INC / DEC
            0xE6 => self.modify_op(bus, Mode::ZeroPage, Self::inc),
            0xF6 => self.modify_op(bus, Mode::ZeroPageX, Self::inc),
            0xEE => self.modify_op(bus, Mode::Absolute, Self::inc),
            0xFE => self.modify_op(bus, Mode::AbsoluteX, Self::inc),
            0xC6 => self.modify_op(bus, Mode::ZeroPage, Self::dec),
            0xD6 => self.modify_op(bus, Mode::ZeroPageX, Self::dec),
            0xCE => self.modify_op(bus, Mode::Absolute, Self::dec),
            0xDE => self.modify_op(bus, Mode::AbsoluteX, Self::dec),

            // Register increments and decrements
            0xE8 => self.implied(|r| {
                r.x = r.x.wrapping_add(1);
                r.p.update_nz(r.x);
            }),
            0xC8 => self.implied(|r| {
                r.y = r.y.wrapping_add(1);
                r.p.update_nz(r.y);
            }),
            0xCA => self.implied(|r| {
                r.x = r.x.wrapping_sub(1);
                r.p.update_nz(r.x);
            }),
            0x88 => self.implied(|r| {
                r.y = r.y.wrapping_sub(1);
                r.p.update_nz(r.y);
            }),

            // Transfers. TXS is the only one that leaves the flags alone.
            0xAA => self.implied(|r| {
                r.x = r.a;
                r.p.update_nz(r.x);
            }),
            0xA8 => self.implied(|r| {
                r.y = r.a;
                r.p.update_nz(r.y);
            }),
            0x8A => self.implied(|r| {
                r.a = r.x;
                r.p.update_nz(r.a);
            }),
            0x98 => self.implied(|r| {
                r.a = r.y;
                r.p.update_nz(r.a);
            }),
            0xBA => self.implied(|r| {
                r.x = r.s;
                r.p.update_nz(r.x);
            }),
            0x9A => self.implied(|r| r.s = r.x),

            // Flag operations
            0x18 => self.implied(|r| r.p.clear(C)),
            0x38 => self.implied(|r| r.p.set(C)),
            0x58 => self.implied(|r| r.p.clear(I)),
            0x78 => self.implied(|r| r.p.set(I)),
            0xD8 => self.implied(|r| r.p.clear(D)),
            0xF8 => self.implied(|r| r.p.set(D)),
            0xB8 => self.implied(|r| r.p.clear(V)),

            // NOP
            0xEA => 2,

            // Stack
            0x48 => {
                self.push(bus, self.regs.a);
                3
            }
            0x08 => {
                self.push(bus, self.regs.p.to_byte_brk());
                3
            }
            0x68 => {
                let value = self.pull(bus);
                self.lda(value);
                4
            }
            0x28 => {
                let value = self.pull(bus);
                self.regs.p = crate::Status::from_stack(value);
                4
            }

            // Branches
            0x10 => self.branch(bus, !self.regs.p.is_set(N)),
            0x30 => self.branch(bus, self.regs.p.is_set(N)),
            0x50 => self.branch(bus, !self.regs.p.is_set(V)),
            0x70 => self.branch(bus, self.regs.p.is_set(V)),
            0x90 => self.branch(bus, !self.regs.p.is_set(C)),
            0xB0 => self.branch(bus, self.regs.p.is_set(C)),
            0xD0 => self.branch(bus, !self.regs.p.is_set(Z)),
            0xF0 => self.branch(bus, self.regs.p.is_set(Z)),

            // JMP
            0x4C => {
                self.regs.pc = self.fetch_word(bus);
                3
            }
            0x6C => {
                let pointer = self.fetch_word(bus);
                self.regs.pc = Self::read_word_page_bug(bus, pointer);
                5
            }

            // JSR pushes the address of its own last byte.
            0x20 => {
                let low = self.fetch(bus);
                self.push_word(bus, self.regs.pc);
                let high = self.fetch(bus);
                self.regs.pc = u16::from_le_bytes([low, high]);
                6
            }

            // RTS
            0x60 => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
                6
            }

            // RTI
            0x40 => {
                let status = self.pull(bus);
                self.regs.p = crate::Status::from_stack(status);
                self.regs.pc = self.pull_word(bus);
                self.interrupt_depth = self.interrupt_depth.saturating_sub(1);
                if self.interrupt_depth == 0 {
                    self.state = CpuState::Running;
                }
                6
            }

            // BRK skips its padding byte and pushes status with B set.
            0x00 => {
                self.fetch(bus);
                self.enter_interrupt(bus, IRQ_VECTOR, true)
            }

            _ => return None,
        };
        Some(cycles)
    }
}

impl Cpu for Mos6510 {
    type Registers = Registers;
    type Error = CpuError;

    fn step<B: Bus>(&mut self, bus: &mut B) -> Result<u32, CpuError> {
        Mos6510::step(self, bus)
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    fn set_irq(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.regs.pc = Self::read_word(bus, RESET_VECTOR);
        self.state = CpuState::Running;
        self.interrupt_depth = 0;
        self.nmi_pending = false;
        self.irq_line = false;
    }
}

impl Observable for Mos6510 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" => Some(self.regs.s.into()),
            "p" => Some(p.0.into()),
            "flags.c" => Some(p.is_set(C).into()),
            "flags.z" => Some(p.is_set(Z).into()),
            "flags.i" => Some(p.is_set(I).into()),
            "flags.d" => Some(p.is_set(D).into()),
            "flags.b" => Some(p.is_set(B).into()),
            "flags.v" => Some(p.is_set(V).into()),
            "flags.n" => Some(p.is_set(N).into()),
            "state" => Some(format!("{:?}", self.state).into()),
            "cycles" => Some(self.total_cycles.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "s", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.b",
            "flags.v", "flags.n", "state", "cycles",
        ]
    }
}
