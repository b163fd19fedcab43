//! SID voice: oscillator, waveform generation and envelope.
//!
//! The oscillator is a 24-bit phase accumulator that advances by the
//! 16-bit frequency register once per CPU cycle. `advance()` moves it by a
//! whole batch of cycles at once, clocks the noise LFSR on every rising
//! edge of accumulator bit 19 inside that span, and steps the envelope.

use crate::envelope::Envelope;

/// Noise LFSR seed value (non-zero, all 23 bits set).
pub const NOISE_LFSR_SEED: u32 = 0x7F_FFFF;

const ACCUMULATOR_MASK: u32 = 0x00FF_FFFF;
const MSB: u32 = 0x0080_0000;
const BIT19_PERIOD: u64 = 1 << 20;
const BIT19_OFFSET: u64 = 1 << 19;

/// Control register bits.
pub mod control {
    pub const GATE: u8 = 0x01;
    pub const SYNC: u8 = 0x02;
    pub const RING_MOD: u8 = 0x04;
    pub const TEST: u8 = 0x08;
    pub const TRIANGLE: u8 = 0x10;
    pub const SAWTOOTH: u8 = 0x20;
    pub const PULSE: u8 = 0x40;
    pub const NOISE: u8 = 0x80;
}

/// Step a 23-bit Fibonacci LFSR once. Feedback is bit 17 ^ bit 0 ^ bit 22.
#[must_use]
pub fn lfsr_step(state: u32) -> u32 {
    let feedback = ((state >> 17) ^ state ^ (state >> 22)) & 1;
    ((state << 1) | feedback) & 0x7F_FFFF
}

/// One of the three SID voices.
#[derive(Debug, Clone)]
pub struct Voice {
    /// 24-bit phase accumulator.
    accumulator: u32,
    /// 16-bit frequency register.
    pub frequency: u16,
    /// 12-bit pulse width register.
    pub pulse_width: u16,
    /// Control register.
    control: u8,
    /// 23-bit noise LFSR.
    noise_lfsr: u32,
    pub envelope: Envelope,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accumulator: 0,
            frequency: 0,
            pulse_width: 0,
            control: 0,
            noise_lfsr: NOISE_LFSR_SEED,
            envelope: Envelope::new(),
        }
    }

    #[must_use]
    pub fn control(&self) -> u8 {
        self.control
    }

    #[must_use]
    pub fn accumulator(&self) -> u32 {
        self.accumulator
    }

    #[must_use]
    pub fn noise_lfsr(&self) -> u32 {
        self.noise_lfsr
    }

    /// Reset the noise generator to a known state.
    pub fn seed_noise(&mut self, seed: u32) {
        self.noise_lfsr = seed & 0x7F_FFFF;
    }

    #[must_use]
    pub fn gate(&self) -> bool {
        self.control & control::GATE != 0
    }

    /// Write the control register. Gate edges move the envelope at once.
    ///
    /// Returns `Some(true)` on a rising gate edge, `Some(false)` on a
    /// falling edge and `None` when the gate did not change.
    pub fn write_control(&mut self, value: u8) -> Option<bool> {
        let was_gated = self.gate();
        self.control = value;
        if value & control::TEST != 0 {
            self.accumulator = 0;
            self.noise_lfsr = NOISE_LFSR_SEED;
        }
        match (was_gated, self.gate()) {
            (false, true) => {
                self.envelope.gate_on();
                Some(true)
            }
            (true, false) => {
                self.envelope.gate_off();
                Some(false)
            }
            _ => None,
        }
    }

    /// Advance oscillator and envelope by `cycles` CPU cycles spanning
    /// `seconds` of time. Returns true if the accumulator wrapped, which
    /// drives hard sync of the next voice.
    pub fn advance(&mut self, cycles: u32, seconds: f32) -> bool {
        self.envelope.advance(seconds);

        if self.control & control::TEST != 0 {
            self.accumulator = 0;
            self.noise_lfsr = NOISE_LFSR_SEED;
            return false;
        }

        let start = u64::from(self.accumulator);
        let end = start + u64::from(self.frequency) * u64::from(cycles);

        let edges = (end + BIT19_OFFSET) / BIT19_PERIOD - (start + BIT19_OFFSET) / BIT19_PERIOD;
        for _ in 0..edges {
            self.noise_lfsr = lfsr_step(self.noise_lfsr);
        }

        self.accumulator = (end as u32) & ACCUMULATOR_MASK;
        end > u64::from(ACCUMULATOR_MASK)
    }

    /// Hard sync: restart the oscillator.
    pub fn sync(&mut self) {
        self.accumulator = 0;
    }

    /// Accumulator MSB, the ring modulation source bit.
    #[must_use]
    pub fn msb(&self) -> bool {
        self.accumulator & MSB != 0
    }

    /// 12-bit waveform output. Multiple selected waveforms are ANDed.
    ///
    /// `ring_source_msb` is the MSB of the voice feeding ring modulation.
    #[must_use]
    pub fn waveform_output(&self, ring_source_msb: bool) -> u16 {
        let selected = self.control & 0xF0;
        if selected == 0 {
            return 0;
        }

        let mut output: u16 = 0xFFF;

        if selected & control::TRIANGLE != 0 {
            let mut phase = self.accumulator;
            if self.control & control::RING_MOD != 0 && ring_source_msb {
                phase ^= MSB;
            }
            let folded = if phase & MSB != 0 {
                (phase ^ 0x007F_FFFF) >> 11
            } else {
                phase >> 11
            };
            output &= (folded & 0xFFF) as u16;
        }

        let saw = ((self.accumulator >> 12) & 0xFFF) as u16;
        if selected & control::SAWTOOTH != 0 {
            output &= saw;
        }

        if selected & control::PULSE != 0 {
            output &= if saw < self.pulse_width & 0xFFF {
                0xFFF
            } else {
                0x000
            };
        }

        if selected & control::NOISE != 0 {
            output &= self.noise_output();
        }

        output
    }

    /// LFSR bits 20, 18, 14, 11, 9, 5, 2, 0 as output bits 11..4.
    fn noise_output(&self) -> u16 {
        let lfsr = self.noise_lfsr;
        let bits = (((lfsr >> 20) & 1) << 11)
            | (((lfsr >> 18) & 1) << 10)
            | (((lfsr >> 14) & 1) << 9)
            | (((lfsr >> 11) & 1) << 8)
            | (((lfsr >> 9) & 1) << 7)
            | (((lfsr >> 5) & 1) << 6)
            | (((lfsr >> 2) & 1) << 5)
            | ((lfsr & 1) << 4);
        bits as u16
    }

    /// Waveform scaled to -1.0..=1.0 and multiplied by the envelope.
    /// Silent when no waveform is selected, whatever the envelope does.
    #[must_use]
    pub fn output(&self, ring_source_msb: bool) -> f32 {
        if self.control & 0xF0 == 0 {
            return 0.0;
        }
        let wave = f32::from(self.waveform_output(ring_source_msb));
        let centred = (wave - 2048.0) / 2048.0;
        centred * self.envelope.amplitude()
    }
}
