//! MOS 6581 SID (Sound Interface Device) emulator.
//!
//! Three voices, each a 24-bit phase-accumulator oscillator with four
//! waveforms and an ADSR envelope, mixed through a shared multi-mode filter.
//!
//! The chip is clocked in two halves. As a [`Tickable`] it only counts CPU
//! cycles; [`Sid6581::synthesize`] then advances every voice by the cycles
//! counted since the previous sample and produces one output sample.
//!
//! # Register map (29 registers, $D400–$D41C)
//!
//! | Addr | Register          |
//! |------|-------------------|
//! | $00  | Voice 1 freq lo   |
//! | $01  | Voice 1 freq hi   |
//! | $02  | Voice 1 PW lo     |
//! | $03  | Voice 1 PW hi     |
//! | $04  | Voice 1 control   |
//! | $05  | Voice 1 AD        |
//! | $06  | Voice 1 SR        |
//! | $07–$0D | Voice 2 (same layout) |
//! | $0E–$14 | Voice 3 (same layout) |
//! | $15  | Filter cutoff lo  |
//! | $16  | Filter cutoff hi  |
//! | $17  | Filter routing + resonance |
//! | $18  | Volume + filter mode |
//! | $19  | Paddle X (read-only) |
//! | $1A  | Paddle Y (read-only) |
//! | $1B  | OSC3 output (read-only) |
//! | $1C  | ENV3 output (read-only) |

#![allow(clippy::cast_precision_loss)]

mod envelope;
mod error;
mod events;
mod filter;
mod registers;
mod voice;

use emu_core::{Observable, Tickable, Ticks, Value};
use log::debug;

pub use envelope::{Envelope, Stage, attack_seconds, decay_release_seconds};
pub use error::SidError;
pub use events::{EventTracker, NoteStart, VoiceEvent, Waveform, midi_tone};
pub use filter::{BAND_PASS, Filter, HIGH_PASS, LOW_PASS};
pub use registers::{REGISTER_COUNT, REGISTERS, Register, VoiceRegister};
pub use voice::{NOISE_LFSR_SEED, Voice, control, lfsr_step};

/// $D418 bit 7: voice 3 disconnected from the direct output.
const VOICE3_OFF: u8 = 0x80;

/// MOS 6581 SID chip.
#[derive(Debug, Clone)]
pub struct Sid6581 {
    pub voices: [Voice; 3],
    pub filter: Filter,
    /// 4-bit master volume.
    pub volume: u8,
    /// Voice 3 kept out of the mix (still usable as a modulator).
    pub voice3_off: bool,

    /// Last value written to each register, masked to its width.
    latched: [u8; REGISTER_COUNT],
    cpu_frequency: u32,
    sample_rate: u32,
    /// CPU cycles counted since the last synthesized sample.
    pending_cycles: u64,
    /// Samples produced so far.
    frame: u64,
    events: EventTracker,
}

impl Sid6581 {
    /// Create a SID clocked at `cpu_frequency` Hz producing samples at
    /// `sample_rate` Hz.
    #[must_use]
    pub fn new(cpu_frequency: u32, sample_rate: u32) -> Self {
        Self {
            voices: [Voice::new(), Voice::new(), Voice::new()],
            filter: Filter::new(),
            volume: 0,
            voice3_off: false,
            latched: [0; REGISTER_COUNT],
            cpu_frequency,
            sample_rate,
            pending_cycles: 0,
            frame: 0,
            events: EventTracker::new(),
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output samples produced so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Oscillator frequency of `voice` in Hz.
    #[must_use]
    pub fn voice_hz(&self, voice: usize) -> f64 {
        f64::from(self.voices[voice].frequency) * f64::from(self.cpu_frequency)
            / f64::from(1u32 << 24)
    }

    /// Read a register by offset within the window.
    ///
    /// Write registers return the last value written. Paddles read $FF;
    /// OSC3 and ENV3 reflect voice 3 live.
    pub fn read_register(&self, offset: u8) -> Result<u8, SidError> {
        let value = match Register::decode(offset)? {
            Register::PaddleX | Register::PaddleY => 0xFF,
            Register::Osc3 => {
                let ring_msb = self.voices[1].msb();
                (self.voices[2].waveform_output(ring_msb) >> 4) as u8
            }
            Register::Env3 => self.voices[2].envelope.level(),
            _ => self.latched[usize::from(offset)],
        };
        Ok(value)
    }

    /// Write a register by offset within the window.
    ///
    /// Writes to read-only registers are accepted and dropped.
    pub fn write_register(&mut self, offset: u8, value: u8) -> Result<(), SidError> {
        let register = Register::decode(offset)?;
        if register.is_read_only() {
            debug!("SID: write ${value:02X} to read-only register ${offset:02X} ignored");
            return Ok(());
        }
        let value = value & register.width_mask();
        self.latched[usize::from(offset)] = value;

        match register {
            Register::Voice { voice, field } => self.write_voice(voice, field, value),
            Register::CutoffLo => {
                self.filter.cutoff = (self.filter.cutoff & 0x7F8) | u16::from(value);
            }
            Register::CutoffHi => {
                self.filter.cutoff = (self.filter.cutoff & 0x007) | (u16::from(value) << 3);
            }
            Register::ResonanceRouting => {
                self.filter.resonance = value >> 4;
                self.filter.routing = value & 0x07;
                self.filter.ext_in = value & 0x08 != 0;
            }
            Register::ModeVolume => {
                self.volume = value & 0x0F;
                self.filter.mode = value & 0x70;
                self.voice3_off = value & VOICE3_OFF != 0;
            }
            Register::PaddleX | Register::PaddleY | Register::Osc3 | Register::Env3 => {}
        }
        Ok(())
    }

    fn write_voice(&mut self, index: usize, field: VoiceRegister, value: u8) {
        let frame = self.frame;
        let voice = &mut self.voices[index];
        match field {
            VoiceRegister::FrequencyLo => {
                voice.frequency = (voice.frequency & 0xFF00) | u16::from(value);
            }
            VoiceRegister::FrequencyHi => {
                voice.frequency = (voice.frequency & 0x00FF) | (u16::from(value) << 8);
            }
            VoiceRegister::PulseWidthLo => {
                voice.pulse_width = (voice.pulse_width & 0x0F00) | u16::from(value);
            }
            VoiceRegister::PulseWidthHi => {
                voice.pulse_width = (voice.pulse_width & 0x00FF) | (u16::from(value) << 8);
            }
            VoiceRegister::Control => {
                match voice.write_control(value) {
                    Some(true) => {
                        let start = NoteStart {
                            tone: midi_tone(self.voice_hz(index)),
                            waveform: Waveform::from_control(value),
                            attack: self.voices[index].envelope.attack,
                            decay: self.voices[index].envelope.decay,
                            release: self.voices[index].envelope.release,
                        };
                        self.events.gate_on(index, frame, start);
                    }
                    Some(false) => {
                        let release = self.voices[index].envelope.release;
                        self.events.gate_off(index, frame, release);
                    }
                    None => {}
                }
                return;
            }
            VoiceRegister::AttackDecay => {
                voice.envelope.attack = value >> 4;
                voice.envelope.decay = value & 0x0F;
                return;
            }
            VoiceRegister::SustainRelease => {
                voice.envelope.sustain = value >> 4;
                voice.envelope.release = value & 0x0F;
                return;
            }
        }
        if matches!(
            field,
            VoiceRegister::FrequencyLo | VoiceRegister::FrequencyHi
        ) {
            let tone = midi_tone(self.voice_hz(index));
            self.events.pitch(index, frame, tone);
        }
    }

    /// Produce the next output sample in -1.0..=1.0.
    ///
    /// Advances all voices by the cycles counted since the previous call,
    /// mixes direct and filtered paths and scales by master volume. While
    /// any voice has SYNC set the oscillators advance one cycle at a time,
    /// so a synced voice restarts on the cycle its source wraps.
    pub fn synthesize(&mut self) -> f32 {
        let cycles = u32::try_from(self.pending_cycles).unwrap_or(u32::MAX);
        self.pending_cycles = 0;
        let seconds = cycles as f32 / self.cpu_frequency as f32;

        if self.voices.iter().any(|v| v.control() & control::SYNC != 0) {
            let per_cycle = seconds / cycles.max(1) as f32;
            for _ in 0..cycles {
                self.advance_voices(1, per_cycle);
            }
        } else {
            self.advance_voices(cycles, seconds);
        }

        let mut direct = 0.0;
        let mut filtered = 0.0;
        for i in 0..3 {
            let ring_msb = self.voices[(i + 2) % 3].msb();
            let out = self.voices[i].output(ring_msb);
            if self.filter.voice_routed(i) {
                filtered += out;
            } else if !(i == 2 && self.voice3_off) {
                direct += out;
            }
        }

        let mixed = direct + self.filter.clock(filtered, self.sample_rate);
        self.frame += 1;
        mixed * f32::from(self.volume) / 15.0 / 3.0
    }

    /// Advance every oscillator, then restart each synced voice whose
    /// source wrapped. Voice n syncs to voice n-1 (voice 1 to voice 3).
    fn advance_voices(&mut self, cycles: u32, seconds: f32) {
        let mut wrapped = [false; 3];
        for (voice, wrap) in self.voices.iter_mut().zip(&mut wrapped) {
            *wrap = voice.advance(cycles, seconds);
        }
        for i in 0..3 {
            let source = (i + 2) % 3;
            if self.voices[i].control() & control::SYNC != 0 && wrapped[source] {
                self.voices[i].sync();
            }
        }
    }

    /// Completed notes for `voice`.
    #[must_use]
    pub fn events(&self, voice: usize) -> &[VoiceEvent] {
        self.events.events(voice)
    }

    /// Close any open notes at the current frame and drain all events.
    pub fn finish_events(&mut self) -> [Vec<VoiceEvent>; 3] {
        self.events.finish(self.frame)
    }
}

impl Tickable for Sid6581 {
    fn tick(&mut self) {
        self.pending_cycles += 1;
    }

    fn tick_n(&mut self, count: Ticks) {
        self.pending_cycles += count.get();
    }
}

impl Observable for Sid6581 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "volume" => return Some(self.volume.into()),
            "frame" => return Some(self.frame.into()),
            "filter.cutoff" => return Some(self.filter.cutoff.into()),
            "filter.resonance" => return Some(self.filter.resonance.into()),
            "filter.mode" => return Some(self.filter.mode.into()),
            "filter.routing" => return Some(self.filter.routing.into()),
            _ => {}
        }

        let (voice, field) = path.split_once('.')?;
        let index = match voice {
            "voice1" => 0,
            "voice2" => 1,
            "voice3" => 2,
            _ => return None,
        };
        let v = &self.voices[index];
        match field {
            "frequency" => Some(v.frequency.into()),
            "pulse_width" => Some(v.pulse_width.into()),
            "control" => Some(v.control().into()),
            "accumulator" => Some(v.accumulator().into()),
            "envelope" => Some(format!("{:?}", v.envelope.stage()).into()),
            "amplitude" => Some(v.envelope.amplitude().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "volume",
            "frame",
            "filter.cutoff",
            "filter.resonance",
            "filter.mode",
            "filter.routing",
            "voice<n>.frequency",
            "voice<n>.pulse_width",
            "voice<n>.control",
            "voice<n>.accumulator",
            "voice<n>.envelope",
            "voice<n>.amplitude",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAL: u32 = 985_248;
    const RATE: u32 = 44_100;

    fn render(sid: &mut Sid6581, samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|_| {
                sid.tick_n(Ticks::new(22));
                sid.synthesize()
            })
            .collect()
    }

    #[test]
    fn silent_when_no_voices_active() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x18, 0x0F).expect("volume");
        let buf = render(&mut sid, 1000);
        assert!(buf.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn frequency_round_trips() {
        let mut sid = Sid6581::new(PAL, RATE);
        for (lo, hi) in [(0x00, 0x10), (0x34, 0x12), (0xFF, 0xFF)] {
            sid.write_register(0x07, lo).expect("write");
            sid.write_register(0x08, hi).expect("write");
            assert_eq!(sid.read_register(0x07), Ok(lo));
            assert_eq!(sid.read_register(0x08), Ok(hi));
        }
        assert_eq!(sid.voices[1].frequency, 0xFFFF);
    }

    #[test]
    fn reads_are_masked_to_register_width() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x03, 0xFF).expect("write");
        sid.write_register(0x15, 0xFF).expect("write");
        assert_eq!(sid.read_register(0x03), Ok(0x0F));
        assert_eq!(sid.read_register(0x15), Ok(0x07));
        assert_eq!(sid.voices[0].pulse_width, 0x0F00);
        assert_eq!(sid.filter.cutoff, 0x0007);
    }

    #[test]
    fn unsupported_register_is_an_error() {
        let mut sid = Sid6581::new(PAL, RATE);
        assert_eq!(
            sid.write_register(0x1D, 0),
            Err(SidError::UnsupportedRegister(0x1D))
        );
        assert_eq!(
            sid.read_register(0x1F),
            Err(SidError::UnsupportedRegister(0x1F))
        );
    }

    #[test]
    fn read_only_writes_are_ignored() {
        let mut sid = Sid6581::new(PAL, RATE);
        assert_eq!(sid.write_register(0x19, 0x12), Ok(()));
        assert_eq!(sid.read_register(0x19), Ok(0xFF));
        assert_eq!(sid.read_register(0x1C), Ok(0));
    }

    #[test]
    fn sawtooth_produces_both_polarities() {
        let mut sid = Sid6581::new(PAL, RATE);
        // ~440 Hz: 440 * 2^24 / 985248
        let freq: u16 = 7493;
        sid.write_register(0x00, freq as u8).expect("write");
        sid.write_register(0x01, (freq >> 8) as u8).expect("write");
        sid.write_register(0x06, 0xF0).expect("write");
        sid.write_register(0x18, 0x0F).expect("write");
        sid.write_register(0x04, 0x21).expect("write");

        let buf = render(&mut sid, 2000);
        assert!(buf.iter().any(|&s| s > 0.05));
        assert!(buf.iter().any(|&s| s < -0.05));
        assert!(buf.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn attack_amplitude_rises_each_sample() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x05, 0x20).expect("write"); // attack 16 ms
        sid.write_register(0x06, 0xF0).expect("write");
        sid.write_register(0x04, 0x11).expect("write");
        assert_eq!(sid.voices[0].envelope.stage(), Stage::Attack);

        let mut previous = 0.0;
        let mut samples = 0;
        while sid.voices[0].envelope.stage() == Stage::Attack {
            sid.tick_n(Ticks::new(22));
            sid.synthesize();
            let amp = sid.voices[0].envelope.amplitude();
            assert!(amp > previous);
            previous = amp;
            samples += 1;
        }
        // 16 ms at 22 cycles per sample.
        let expected = (0.016 * f64::from(PAL) / 22.0).ceil() as i64;
        assert!((samples - expected).abs() <= 1, "{samples} vs {expected}");
    }

    #[test]
    fn voice3_off_removes_it_from_direct_mix() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x0F, 0x20).expect("write");
        sid.write_register(0x14, 0xF0).expect("write");
        sid.write_register(0x12, 0x21).expect("write");
        sid.write_register(0x18, 0x8F).expect("write");

        let buf = render(&mut sid, 500);
        assert!(buf.iter().all(|s| s.abs() < 1e-6));
        assert_ne!(sid.read_register(0x1C), Ok(0), "ENV3 still runs");
    }

    #[test]
    fn osc3_tracks_voice3_oscillator() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x0E, 0xFF).expect("write");
        sid.write_register(0x0F, 0x10).expect("write");
        sid.write_register(0x12, 0x20).expect("write");
        sid.tick_n(Ticks::new(100));
        sid.synthesize();
        let expected = (sid.voices[2].accumulator() >> 16) as u8;
        assert_eq!(sid.read_register(0x1B), Ok(expected));
    }

    #[test]
    fn gate_writes_produce_events() {
        let mut sid = Sid6581::new(PAL, RATE);
        // Voice 1 at 440 Hz, triangle.
        sid.write_register(0x00, 0x45).expect("write");
        sid.write_register(0x01, 0x1D).expect("write");
        sid.write_register(0x05, 0x12).expect("write");
        sid.write_register(0x06, 0xA3).expect("write");
        sid.write_register(0x04, 0x11).expect("write");
        render(&mut sid, 10);
        sid.write_register(0x01, 0x3A).expect("write"); // up an octave
        render(&mut sid, 10);
        sid.write_register(0x04, 0x10).expect("write");

        let events = sid.events(0);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.start_frame, 0);
        assert_eq!(event.tone, 69);
        assert_eq!(event.waveform, Waveform::Triangle);
        assert_eq!((event.attack, event.decay, event.release), (1, 2, 3));
        assert_eq!(event.sustain_length, 20);
        assert_eq!(event.pitch_changes, vec![(10, 81)]);
    }

    #[test]
    fn observable_reports_voice_state() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x08, 0x12).expect("write");
        sid.write_register(0x0B, 0x41).expect("write");
        assert_eq!(sid.query("voice2.frequency"), Some(Value::U16(0x1200)));
        assert_eq!(sid.query("voice2.envelope"), Some(Value::from("Attack")));
        assert_eq!(sid.query("voice4.frequency"), None);
    }

    #[test]
    fn hard_sync_restarts_on_the_wrap_cycle() {
        let mut sid = Sid6581::new(PAL, RATE);
        // Voice 3 at $8000 wraps after 512 cycles.
        sid.write_register(0x0E, 0x00).expect("write");
        sid.write_register(0x0F, 0x80).expect("write");
        sid.write_register(0x00, 0x00).expect("write");
        sid.write_register(0x01, 0x01).expect("write");
        sid.write_register(0x04, control::SYNC).expect("write");
        sid.tick_n(Ticks::new(520));
        sid.synthesize();
        // Restarted at cycle 512, then 8 more cycles at $0100.
        assert_eq!(sid.voices[0].accumulator(), 8 * 0x0100);
        assert_eq!(sid.voices[2].accumulator(), 8 * 0x8000);
    }

    #[test]
    fn gate_only_voice_adds_no_offset() {
        let mut sid = Sid6581::new(PAL, RATE);
        sid.write_register(0x06, 0xF0).expect("sustain");
        sid.write_register(0x18, 0x0F).expect("volume");
        sid.write_register(0x04, control::GATE).expect("gate");
        let buf = render(&mut sid, 2000);
        assert!(sid.voices[0].envelope.amplitude() > 0.9);
        assert!(buf.iter().all(|s| s.abs() < 1e-6));
    }
}
