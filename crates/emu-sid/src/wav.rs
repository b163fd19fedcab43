//! WAV file output via `hound`.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use log::info;

use crate::sink::{AudioSink, SinkError};

/// Writes mono 16-bit PCM to a WAV container. The header is patched with
/// the final length on `finish()`.
pub struct WavSink<W: Write + Seek> {
    writer: Option<hound::WavWriter<W>>,
    written: u64,
}

fn spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

impl WavSink<BufWriter<File>> {
    /// Create (or truncate) a WAV file at `path`.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, SinkError> {
        let writer = hound::WavWriter::create(path, spec(sample_rate))?;
        Ok(Self {
            writer: Some(writer),
            written: 0,
        })
    }
}

impl<W: Write + Seek> WavSink<W> {
    /// Write WAV data to any seekable writer.
    pub fn new(inner: W, sample_rate: u32) -> Result<Self, SinkError> {
        let writer = hound::WavWriter::new(inner, spec(sample_rate))?;
        Ok(Self {
            writer: Some(writer),
            written: 0,
        })
    }

    /// Samples written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write + Seek> AudioSink for WavSink<W> {
    fn accept(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Finished)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        self.written += samples.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            info!("WAV: {} samples written", self.written);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hound_reader() {
        let path = std::env::temp_dir().join(format!("emu-sid-wav-{}.wav", std::process::id()));
        let mut sink = WavSink::create(&path, 22_050).expect("create wav");
        sink.accept(&[0, 1000, -1000]).expect("write");
        sink.accept(&[i16::MAX]).expect("write");
        sink.finish().expect("finalize");
        assert!(matches!(sink.accept(&[1]), Err(SinkError::Finished)));

        let mut reader = hound::WavReader::open(&path).expect("open wav");
        assert_eq!(reader.spec().sample_rate, 22_050);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .expect("read samples");
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
        let _ = std::fs::remove_file(&path);
    }
}
