//! ALU operations.
//!
//! Each operation takes the operand value already fetched by the
//! addressing helpers. Read-modify-write operations return the new value.

use crate::Mos6510;
use crate::flags::{C, N, V, Z};

impl Mos6510 {
    fn carry_in(&self) -> u16 {
        u16::from(self.regs.p.is_set(C))
    }

    pub(crate) fn lda(&mut self, value: u8) {
        self.regs.a = value;
        self.regs.p.update_nz(value);
    }

    pub(crate) fn ldx(&mut self, value: u8) {
        self.regs.x = value;
        self.regs.p.update_nz(value);
    }

    pub(crate) fn ldy(&mut self, value: u8) {
        self.regs.y = value;
        self.regs.p.update_nz(value);
    }

    pub(crate) fn ora(&mut self, value: u8) {
        self.lda(self.regs.a | value);
    }

    pub(crate) fn and(&mut self, value: u8) {
        self.lda(self.regs.a & value);
    }

    pub(crate) fn eor(&mut self, value: u8) {
        self.lda(self.regs.a ^ value);
    }

    /// ADC - Add with Carry. Decimal mode follows NMOS behaviour: Z comes
    /// from the binary sum, N and V from the half-adjusted high nibble.
    pub(crate) fn adc(&mut self, value: u8) {
        if self.regs.p.is_set(crate::flags::D) {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = self.regs.a;
        let result = u16::from(a) + u16::from(value) + self.carry_in();
        let result8 = result as u8;

        self.regs.p.set_if(C, result > 0xFF);
        self.regs.p.set_if(V, (a ^ result8) & (value ^ result8) & 0x80 != 0);
        self.lda(result8);
    }

    fn adc_decimal(&mut self, value: u8) {
        let a = u16::from(self.regs.a);
        let v = u16::from(value);
        let c = self.carry_in();

        let mut low = (a & 0x0F) + (v & 0x0F) + c;
        if low > 9 {
            low += 6;
        }
        let mut high = (a >> 4) + (v >> 4) + u16::from(low > 0x0F);

        let binary = (a + v + c) as u8;
        self.regs.p.set_if(Z, binary == 0);
        self.regs.p.set_if(N, high & 0x08 != 0);
        let half = (high << 4) as u8;
        self.regs
            .p
            .set_if(V, (self.regs.a ^ half) & (value ^ half) & 0x80 != 0);

        if high > 9 {
            high += 6;
        }
        self.regs.p.set_if(C, high > 0x0F);
        self.regs.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    /// SBC - Subtract with Carry (carry clear means borrow).
    pub(crate) fn sbc(&mut self, value: u8) {
        if self.regs.p.is_set(crate::flags::D) {
            self.sbc_decimal(value);
        } else {
            // Binary SBC is ADC of the one's complement.
            self.adc_binary(!value);
        }
    }

    fn sbc_decimal(&mut self, value: u8) {
        let a = i16::from(self.regs.a);
        let v = i16::from(value);
        let borrow = 1 - self.carry_in().cast_signed();

        let mut low = (a & 0x0F) - (v & 0x0F) - borrow;
        if low < 0 {
            low = ((low - 6) & 0x0F) - 0x10;
        }
        let mut high = (a >> 4) - (v >> 4) + if low < 0 { -1 } else { 0 };
        if high < 0 {
            high = (high - 6) & 0x0F;
        }

        // Flags come from the binary difference on NMOS parts.
        let binary = a - v - borrow;
        let binary8 = binary as u8;
        self.regs.p.set_if(C, binary >= 0);
        self.regs.p.update_nz(binary8);
        self.regs.p.set_if(
            V,
            (self.regs.a ^ value) & (self.regs.a ^ binary8) & 0x80 != 0,
        );

        self.regs.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.regs.p.set_if(C, register >= value);
        self.regs.p.update_nz(register.wrapping_sub(value));
    }

    pub(crate) fn cmp(&mut self, value: u8) {
        self.compare(self.regs.a, value);
    }

    pub(crate) fn cpx(&mut self, value: u8) {
        self.compare(self.regs.x, value);
    }

    pub(crate) fn cpy(&mut self, value: u8) {
        self.compare(self.regs.y, value);
    }

    pub(crate) fn bit(&mut self, value: u8) {
        self.regs.p.set_if(Z, self.regs.a & value == 0);
        self.regs.p.set_if(N, value & 0x80 != 0);
        self.regs.p.set_if(V, value & 0x40 != 0);
    }

    pub(crate) fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = value << 1;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = value >> 1;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }
}
