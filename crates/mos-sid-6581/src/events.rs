//! Voice activity export.
//!
//! Each gate-on opens a note event for that voice; gate-off closes it.
//! Frequency writes that change the MIDI tone while a note is open are
//! recorded as pitch changes relative to the note's start frame. Frames
//! are output audio samples.

use serde::Serialize;

use crate::voice::control;

/// Waveform selection at gate-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    None,
    Triangle,
    Sawtooth,
    Pulse,
    Noise,
    /// More than one waveform bit set.
    Combined,
}

impl Waveform {
    /// Decode the waveform nibble of a control register.
    #[must_use]
    pub fn from_control(value: u8) -> Self {
        match value & 0xF0 {
            0 => Waveform::None,
            control::TRIANGLE => Waveform::Triangle,
            control::SAWTOOTH => Waveform::Sawtooth,
            control::PULSE => Waveform::Pulse,
            control::NOISE => Waveform::Noise,
            _ => Waveform::Combined,
        }
    }
}

/// One note: gate-on to gate-off on a single voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceEvent {
    /// Frame of the gate-on.
    pub start_frame: u64,
    /// MIDI note number at gate-on.
    pub tone: u8,
    pub waveform: Waveform,
    pub attack: u8,
    pub decay: u8,
    /// Frames between gate-on and gate-off.
    pub sustain_length: u64,
    /// Release rate in effect at gate-off.
    pub release: u8,
    /// `(frame_offset, tone)` for each pitch change while gated.
    pub pitch_changes: Vec<(u64, u8)>,
}

/// Voice state captured when a note starts.
#[derive(Debug, Clone, Copy)]
pub struct NoteStart {
    pub tone: u8,
    pub waveform: Waveform,
    pub attack: u8,
    pub decay: u8,
    pub release: u8,
}

/// Convert an oscillator frequency in Hz to the nearest MIDI note.
#[must_use]
pub fn midi_tone(hz: f64) -> u8 {
    if hz <= 0.0 {
        return 0;
    }
    let note = 69.0 + 12.0 * (hz / 440.0).log2();
    note.round().clamp(0.0, 127.0) as u8
}

#[derive(Debug, Clone, Default)]
struct VoiceTrack {
    open: Option<VoiceEvent>,
    closed: Vec<VoiceEvent>,
}

/// Per-voice event recorder.
#[derive(Debug, Clone, Default)]
pub struct EventTracker {
    voices: [VoiceTrack; 3],
}

impl EventTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate rising edge. A note still open on this voice is closed first.
    pub fn gate_on(&mut self, voice: usize, frame: u64, start: NoteStart) {
        self.gate_off(voice, frame, start.release);
        self.voices[voice].open = Some(VoiceEvent {
            start_frame: frame,
            tone: start.tone,
            waveform: start.waveform,
            attack: start.attack,
            decay: start.decay,
            sustain_length: 0,
            release: start.release,
            pitch_changes: Vec::new(),
        });
    }

    /// Gate falling edge.
    pub fn gate_off(&mut self, voice: usize, frame: u64, release: u8) {
        let track = &mut self.voices[voice];
        if let Some(mut event) = track.open.take() {
            event.sustain_length = frame.saturating_sub(event.start_frame);
            event.release = release;
            track.closed.push(event);
        }
    }

    /// Frequency change. Recorded only while a note is open and the tone
    /// actually moves.
    pub fn pitch(&mut self, voice: usize, frame: u64, tone: u8) {
        let Some(event) = self.voices[voice].open.as_mut() else {
            return;
        };
        let current = event.pitch_changes.last().map_or(event.tone, |&(_, t)| t);
        if tone != current {
            event
                .pitch_changes
                .push((frame.saturating_sub(event.start_frame), tone));
        }
    }

    /// Completed notes for one voice, in start order.
    #[must_use]
    pub fn events(&self, voice: usize) -> &[VoiceEvent] {
        &self.voices[voice].closed
    }

    /// Close every open note at `frame` and hand back all events.
    pub fn finish(&mut self, frame: u64) -> [Vec<VoiceEvent>; 3] {
        for track in &mut self.voices {
            if let Some(mut event) = track.open.take() {
                event.sustain_length = frame.saturating_sub(event.start_frame);
                track.closed.push(event);
            }
        }
        self.voices
            .each_mut()
            .map(|track| std::mem::take(&mut track.closed))
    }
}
