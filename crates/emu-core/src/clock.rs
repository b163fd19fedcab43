//! Master clock configuration.

use crate::Ticks;

/// Master clock configuration for a system.
///
/// Everything derives from the CPU clock here: timers count CPU cycles, the
/// sound chip's oscillators are specified in fractions of it, and the audio
/// output rate is a divided-down view of it.
#[derive(Debug, Clone, Copy)]
pub struct MasterClock {
    /// Clock frequency in Hz (e.g., `985_248` for a PAL C64).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per frame at the given frame rate (integer division).
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> Ticks {
        Ticks::new(self.frequency_hz / frames_per_second)
    }

    /// Fractional ticks per output sample at the given sample rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ticks_per_sample(&self, sample_rate: u32) -> f64 {
        self.frequency_hz as f64 / f64::from(sample_rate)
    }
}
