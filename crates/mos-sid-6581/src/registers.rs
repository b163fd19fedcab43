//! Register window decoding.
//!
//! Offsets $00-$1C map onto a fixed table resolved at compile time: seven
//! bytes per voice, then four global write registers and four read-only
//! registers. Anything past $1C is not a SID register.

use crate::SidError;

/// Number of registers in the window.
pub const REGISTER_COUNT: usize = 29;

/// Per-voice register field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceRegister {
    FrequencyLo,
    FrequencyHi,
    PulseWidthLo,
    PulseWidthHi,
    Control,
    AttackDecay,
    SustainRelease,
}

/// A decoded register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Voice { voice: usize, field: VoiceRegister },
    CutoffLo,
    CutoffHi,
    ResonanceRouting,
    ModeVolume,
    PaddleX,
    PaddleY,
    Osc3,
    Env3,
}

const fn voice(voice: usize, field: VoiceRegister) -> Register {
    Register::Voice { voice, field }
}

use VoiceRegister::{
    AttackDecay, Control, FrequencyHi, FrequencyLo, PulseWidthHi, PulseWidthLo, SustainRelease,
};

/// Offset-indexed register table.
pub const REGISTERS: [Register; REGISTER_COUNT] = [
    voice(0, FrequencyLo),
    voice(0, FrequencyHi),
    voice(0, PulseWidthLo),
    voice(0, PulseWidthHi),
    voice(0, Control),
    voice(0, AttackDecay),
    voice(0, SustainRelease),
    voice(1, FrequencyLo),
    voice(1, FrequencyHi),
    voice(1, PulseWidthLo),
    voice(1, PulseWidthHi),
    voice(1, Control),
    voice(1, AttackDecay),
    voice(1, SustainRelease),
    voice(2, FrequencyLo),
    voice(2, FrequencyHi),
    voice(2, PulseWidthLo),
    voice(2, PulseWidthHi),
    voice(2, Control),
    voice(2, AttackDecay),
    voice(2, SustainRelease),
    Register::CutoffLo,
    Register::CutoffHi,
    Register::ResonanceRouting,
    Register::ModeVolume,
    Register::PaddleX,
    Register::PaddleY,
    Register::Osc3,
    Register::Env3,
];

impl Register {
    /// Look up a register offset.
    pub fn decode(offset: u8) -> Result<Self, SidError> {
        REGISTERS
            .get(usize::from(offset))
            .copied()
            .ok_or(SidError::UnsupportedRegister(offset))
    }

    /// Paddles and voice 3 readback cannot be written.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Register::PaddleX | Register::PaddleY | Register::Osc3 | Register::Env3
        )
    }

    /// Bits the chip actually stores for this register.
    #[must_use]
    pub const fn width_mask(self) -> u8 {
        match self {
            Register::CutoffLo => 0x07,
            Register::Voice {
                field: VoiceRegister::PulseWidthHi,
                ..
            } => 0x0F,
            _ => 0xFF,
        }
    }
}
