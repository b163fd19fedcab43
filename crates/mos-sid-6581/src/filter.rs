//! SID multi-mode filter.
//!
//! A one-pole recurrence run once per output sample:
//!
//! ```text
//! lp += alpha * (in - lp)
//! hp  = in - lp
//! bp += alpha * (hp - bp)
//! ```
//!
//! `alpha = 1 - exp(-2π fc / sample_rate)` with the 11-bit cutoff mapped
//! linearly onto 30 Hz..12 kHz. Resonance boosts the band-pass output.
//! The LP, BP and HP outputs are summed per the mode bits of $D418.

use std::f32::consts::TAU;

/// Mode bit: low-pass.
pub const LOW_PASS: u8 = 0x10;
/// Mode bit: band-pass.
pub const BAND_PASS: u8 = 0x20;
/// Mode bit: high-pass.
pub const HIGH_PASS: u8 = 0x40;

const MIN_CUTOFF_HZ: f32 = 30.0;
const CUTOFF_SPAN_HZ: f32 = 12_000.0;

#[derive(Debug, Clone)]
pub struct Filter {
    lp: f32,
    bp: f32,

    /// 11-bit cutoff register.
    pub cutoff: u16,
    /// 4-bit resonance.
    pub resonance: u8,
    /// Mode bits (LP/BP/HP) as they sit in $D418.
    pub mode: u8,
    /// Voices routed through the filter (bits 0-2 of $D417).
    pub routing: u8,
    /// External input routed through the filter (bit 3 of $D417).
    pub ext_in: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lp: 0.0,
            bp: 0.0,
            cutoff: 0,
            resonance: 0,
            mode: 0,
            routing: 0,
            ext_in: false,
        }
    }

    /// Cutoff frequency in Hz for the current register value.
    #[must_use]
    pub fn cutoff_hz(&self) -> f32 {
        MIN_CUTOFF_HZ + f32::from(self.cutoff & 0x7FF) / 2047.0 * CUTOFF_SPAN_HZ
    }

    /// Smoothing coefficient for one sample at `sample_rate`.
    #[must_use]
    pub fn alpha(&self, sample_rate: u32) -> f32 {
        1.0 - (-TAU * self.cutoff_hz() / sample_rate as f32).exp()
    }

    /// Filter one sample. Returns the sum of the enabled outputs.
    pub fn clock(&mut self, input: f32, sample_rate: u32) -> f32 {
        let alpha = self.alpha(sample_rate);
        self.lp += alpha * (input - self.lp);
        let hp = input - self.lp;
        self.bp += alpha * (hp - self.bp);
        let bp = self.bp * (1.0 + 1.5 * f32::from(self.resonance & 0x0F) / 15.0);

        let mut output = 0.0;
        if self.mode & LOW_PASS != 0 {
            output += self.lp;
        }
        if self.mode & BAND_PASS != 0 {
            output += bp;
        }
        if self.mode & HIGH_PASS != 0 {
            output += hp;
        }
        output
    }

    /// True if voice `voice` (0-2) goes through the filter.
    #[must_use]
    pub fn voice_routed(&self, voice: usize) -> bool {
        self.routing & (1 << voice) != 0
    }

    #[must_use]
    pub fn low_pass_state(&self) -> f32 {
        self.lp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    #[test]
    fn cutoff_maps_onto_audio_range() {
        let mut filter = Filter::new();
        assert!((filter.cutoff_hz() - 30.0).abs() < 1e-3);
        filter.cutoff = 0x7FF;
        assert!((filter.cutoff_hz() - 12_030.0).abs() < 1e-2);
        assert!(filter.alpha(RATE) > 0.0 && filter.alpha(RATE) < 1.0);
    }

    #[test]
    fn low_pass_converges_on_dc() {
        let mut filter = Filter::new();
        filter.cutoff = 0x400;
        filter.mode = LOW_PASS;
        let mut out = 0.0;
        for _ in 0..2000 {
            out = filter.clock(0.5, RATE);
        }
        assert!((out - 0.5).abs() < 1e-3);
    }

    #[test]
    fn high_pass_blocks_dc() {
        let mut filter = Filter::new();
        filter.cutoff = 0x400;
        filter.mode = HIGH_PASS;
        let mut out = 1.0;
        for _ in 0..2000 {
            out = filter.clock(0.5, RATE);
        }
        assert!(out.abs() < 1e-3);
    }

    #[test]
    fn no_mode_bits_is_silent() {
        let mut filter = Filter::new();
        assert_eq!(filter.clock(0.8, RATE), 0.0);
    }
}
