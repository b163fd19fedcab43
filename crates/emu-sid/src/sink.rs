//! Destinations for rendered audio.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("WAV output failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("sink already finished")]
    Finished,
}

/// Receives signed 16-bit mono PCM in buffer-sized batches.
pub trait AudioSink {
    /// Take one batch. Called whenever the clock's sample buffer fills and
    /// on explicit flushes.
    fn accept(&mut self, samples: &[i16]) -> Result<(), SinkError>;

    /// No more samples will follow.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn accept(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        (**self).accept(samples)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Keeps every sample in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Vec<i16>,
    batches: usize,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of `accept` calls seen.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.batches
    }

    #[must_use]
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

impl AudioSink for MemorySink {
    fn accept(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        self.samples.extend_from_slice(samples);
        self.batches += 1;
        Ok(())
    }
}

/// Drops everything. For event-only renders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn accept(&mut self, _samples: &[i16]) -> Result<(), SinkError> {
        Ok(())
    }
}
