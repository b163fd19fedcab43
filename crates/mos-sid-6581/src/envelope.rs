//! SID ADSR envelope generator.
//!
//! Amplitude is a float in 0.0..=1.0 moved by linear ramps. Attack rises at
//! a fixed slope so a full 0→1 sweep takes the table duration. Decay and
//! release are timed from where they start: decay covers 1.0 → sustain and
//! release covers the current level → 0 in their table durations.

/// Attack durations in milliseconds, indexed by the attack nibble.
const ATTACK_MS: [f32; 16] = [
    2.0, 8.0, 16.0, 24.0, 38.0, 56.0, 68.0, 80.0, 100.0, 250.0, 500.0, 800.0, 1000.0, 3000.0,
    5000.0, 8000.0,
];

/// Decay and release durations in milliseconds.
const DECAY_RELEASE_MS: [f32; 16] = [
    6.0, 24.0, 48.0, 72.0, 114.0, 168.0, 204.0, 240.0, 300.0, 750.0, 1500.0, 2400.0, 3000.0,
    9000.0, 15_000.0, 24_000.0,
];

/// Attack duration in seconds for a 4-bit rate.
#[must_use]
pub fn attack_seconds(rate: u8) -> f32 {
    ATTACK_MS[usize::from(rate & 0x0F)] / 1000.0
}

/// Decay/release duration in seconds for a 4-bit rate.
#[must_use]
pub fn decay_release_seconds(rate: u8) -> f32 {
    DECAY_RELEASE_MS[usize::from(rate & 0x0F)] / 1000.0
}

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Off,
}

/// ADSR envelope for one voice.
#[derive(Debug, Clone)]
pub struct Envelope {
    stage: Stage,
    amplitude: f32,
    /// Level at the moment release began.
    release_from: f32,
    /// Attack rate (4-bit).
    pub attack: u8,
    /// Decay rate (4-bit).
    pub decay: u8,
    /// Sustain level (4-bit, 15 = full scale).
    pub sustain: u8,
    /// Release rate (4-bit).
    pub release: u8,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Off,
            amplitude: 0.0,
            release_from: 0.0,
            attack: 0,
            decay: 0,
            sustain: 0,
            release: 0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Amplitude as the 8-bit value ENV3 reads back.
    #[must_use]
    pub fn level(&self) -> u8 {
        (self.amplitude * 255.0).round() as u8
    }

    fn sustain_level(&self) -> f32 {
        f32::from(self.sustain & 0x0F) / 15.0
    }

    /// Gate rising edge. Attack resumes from the current amplitude.
    pub fn gate_on(&mut self) {
        self.stage = Stage::Attack;
    }

    /// Gate falling edge. Release runs from the current amplitude.
    pub fn gate_off(&mut self) {
        if self.stage == Stage::Off {
            return;
        }
        self.release_from = self.amplitude;
        self.stage = if self.amplitude > 0.0 {
            Stage::Release
        } else {
            Stage::Off
        };
    }

    /// Advance by `seconds` of emulated time.
    pub fn advance(&mut self, seconds: f32) {
        match self.stage {
            Stage::Attack => {
                self.amplitude += seconds / attack_seconds(self.attack);
                if self.amplitude >= 1.0 {
                    self.amplitude = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                let target = self.sustain_level();
                let slope = (1.0 - target) / decay_release_seconds(self.decay);
                self.amplitude -= seconds * slope;
                if self.amplitude <= target {
                    self.amplitude = target;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Release => {
                let slope = self.release_from / decay_release_seconds(self.release);
                self.amplitude -= seconds * slope;
                if self.amplitude <= 0.0 {
                    self.amplitude = 0.0;
                    self.stage = Stage::Off;
                }
            }
            Stage::Sustain | Stage::Off => {}
        }
    }
}
