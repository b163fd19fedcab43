//! Cycle lockstep between CPU, CIA and SID.
//!
//! `step()` runs one CPU instruction (or interrupt entry), then clocks the
//! CIA and SID once per cycle it took. A fractional accumulator decides
//! which of those cycles end an audio frame; at each one the SID
//! synthesizes a sample, which is converted to 16-bit and buffered. Full
//! buffers go to the sink.
//!
//! The CIA interrupt line is sampled once per step, so an IRQ raised
//! mid-instruction is taken at the next instruction boundary.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Cpu, MasterClock, Observable, Tickable, Value};
use log::debug;
use mos_6510::{IRQ_VECTOR, Mos6510, NMI_VECTOR, RESET_VECTOR};
use mos_cia_6526::Cia;
use mos_sid_6581::{Sid6581, VoiceEvent};

use crate::bus::SidBus;
use crate::config::SessionConfig;
use crate::error::EmulationError;
use crate::sink::{AudioSink, MemorySink};

/// Interrupt vectors. BRK shares the IRQ vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    Irq,
    Nmi,
    Brk,
    Reset,
}

impl Vector {
    #[must_use]
    pub const fn address(self) -> u16 {
        match self {
            Vector::Irq | Vector::Brk => IRQ_VECTOR,
            Vector::Nmi => NMI_VECTOR,
            Vector::Reset => RESET_VECTOR,
        }
    }
}

/// Convert a mixer sample in -1.0..=1.0 to signed 16-bit.
#[must_use]
pub fn to_pcm(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Owns the CPU, bus and sink, and keeps them in step.
pub struct EmulationClock<S: AudioSink = MemorySink> {
    cpu: Mos6510,
    bus: SidBus,
    sink: S,
    config: SessionConfig,
    /// CPU cycles per audio frame (fractional).
    cycles_per_sample: f64,
    /// Cycles since the last audio frame.
    sample_phase: f64,
    buffer: Vec<i16>,
    cycles: u64,
    frames: u64,
}

impl EmulationClock<MemorySink> {
    /// A clock that keeps its audio in memory.
    ///
    /// # Errors
    ///
    /// [`EmulationError::Config`] if `config` fails validation.
    pub fn new(config: SessionConfig) -> Result<Self, EmulationError> {
        Self::with_sink(config, MemorySink::new())
    }
}

impl<S: AudioSink> EmulationClock<S> {
    /// A clock that hands its audio to `sink`.
    ///
    /// # Errors
    ///
    /// [`EmulationError::Config`] if `config` fails validation.
    pub fn with_sink(config: SessionConfig, sink: S) -> Result<Self, EmulationError> {
        config.validate()?;
        let sid = Sid6581::new(config.cpu_frequency, config.sample_rate);
        let bus = SidBus::new(sid, Cia::new(), config.register_policy);
        let master = MasterClock::new(u64::from(config.cpu_frequency));
        Ok(Self {
            cpu: Mos6510::new(),
            bus,
            sink,
            cycles_per_sample: master.ticks_per_sample(config.sample_rate),
            sample_phase: 0.0,
            buffer: Vec::with_capacity(config.buffer_capacity),
            cycles: 0,
            frames: 0,
            config,
        })
    }

    /// Run one instruction and the peripheral cycles it covers. Returns
    /// the cycle count.
    ///
    /// # Errors
    ///
    /// CPU faults, register accesses refused by the `fail` policy and
    /// sink failures. The step has fully completed when any of these is
    /// reported.
    pub fn step(&mut self) -> Result<u32, EmulationError> {
        let cycles = self.cpu.step(&mut self.bus)?;
        let mut sink_error = None;
        for _ in 0..cycles {
            self.bus.cia.tick();
            self.bus.sid.tick();
            self.sample_phase += 1.0;
            if self.sample_phase >= self.cycles_per_sample {
                self.sample_phase -= self.cycles_per_sample;
                if let Err(err) = self.emit_sample() {
                    sink_error.get_or_insert(err);
                }
            }
        }
        self.cycles += u64::from(cycles);
        self.cpu.set_irq(self.bus.cia.irq_active());

        if let Some(err) = sink_error {
            return Err(err);
        }
        match self.bus.take_fault() {
            Some(fault) => Err(fault),
            None => Ok(cycles),
        }
    }

    fn emit_sample(&mut self) -> Result<(), EmulationError> {
        let sample = self.bus.sid.synthesize();
        self.buffer.push(to_pcm(sample));
        self.frames += 1;
        if self.buffer.len() >= self.config.buffer_capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Hand any buffered samples to the sink.
    pub fn flush(&mut self) -> Result<(), EmulationError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        debug!(
            "clock: flushing {} samples at frame {}",
            self.buffer.len(),
            self.frames
        );
        self.sink.accept(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    /// Step until `n_frames` more audio frames exist. Returns the frames
    /// produced.
    ///
    /// # Errors
    ///
    /// The first error from [`step`](Self::step). An illegal opcode halts
    /// the CPU and ends the run with [`EmulationError::Cpu`].
    pub fn run_for(&mut self, n_frames: u64) -> Result<u64, EmulationError> {
        let start = self.frames;
        let target = start + n_frames;
        while self.frames < target {
            self.step()?;
        }
        Ok(self.frames - start)
    }

    /// Step until at least `n_cycles` more cycles have elapsed. Returns
    /// the cycles actually run, which may overshoot by one instruction.
    pub fn run_cycles(&mut self, n_cycles: u64) -> Result<u64, EmulationError> {
        let start = self.cycles;
        while self.cycles - start < n_cycles {
            self.step()?;
        }
        Ok(self.cycles - start)
    }

    /// Copy a program image into RAM.
    pub fn load(&mut self, bytes: &[u8], address: u16) -> Result<(), EmulationError> {
        self.bus.load(address, bytes)?;
        debug!(
            "clock: loaded {} bytes at ${address:04X}",
            bytes.len()
        );
        Ok(())
    }

    /// Point the CPU at `address`.
    pub fn set_entry(&mut self, address: u16) {
        self.cpu.set_pc(address);
    }

    pub fn set_vector(&mut self, vector: Vector, address: u16) {
        self.bus.poke_word(vector.address(), address);
    }

    #[must_use]
    pub fn vector(&self, vector: Vector) -> u16 {
        self.bus.peek_word(vector.address())
    }

    /// Reset the CPU through the reset vector.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
    }

    pub fn trigger_nmi(&mut self) {
        self.cpu.nmi();
    }

    /// Call a subroutine as JSR would, with `a` in the accumulator, and run
    /// until it returns to `return_to` or `budget` cycles pass.
    ///
    /// Returns true if the routine returned in time. The CPU is left
    /// wherever it stopped either way.
    pub fn call(
        &mut self,
        address: u16,
        a: u8,
        return_to: u16,
        budget: u64,
    ) -> Result<bool, EmulationError> {
        let [lo, hi] = return_to.wrapping_sub(1).to_le_bytes();
        let s = self.cpu.regs.push();
        self.bus.poke(s, hi);
        let s = self.cpu.regs.push();
        self.bus.poke(s, lo);
        self.cpu.regs.a = a;
        self.cpu.set_pc(address);

        let start = self.cycles;
        while self.cpu.regs.pc != return_to {
            if self.cycles - start >= budget {
                return Ok(false);
            }
            self.step()?;
        }
        Ok(true)
    }

    /// Look up a state path: `cpu.*`, `cia.*`, `sid.*` or `clock.*`.
    #[must_use]
    pub fn query(&self, path: &str) -> Option<Value> {
        let (component, rest) = path.split_once('.')?;
        match component {
            "cpu" => self.cpu.query(rest),
            "cia" => self.bus.cia.query(rest),
            "sid" => self.bus.sid.query(rest),
            "clock" => match rest {
                "cycles" => Some(self.cycles.into()),
                "frames" => Some(self.frames.into()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Every path `query` understands.
    #[must_use]
    pub fn query_paths(&self) -> Vec<String> {
        let prefixed = |prefix: &str, paths: &[&str]| {
            paths
                .iter()
                .map(|p| format!("{prefix}.{p}"))
                .collect::<Vec<_>>()
        };
        let mut paths = prefixed("cpu", self.cpu.query_paths());
        paths.extend(prefixed("cia", self.bus.cia.query_paths()));
        paths.extend(prefixed("sid", self.bus.sid.query_paths()));
        paths.extend(prefixed("clock", &["cycles", "frames"][..]));
        paths
    }

    /// Close open notes and drain the voice event log.
    pub fn finish_events(&mut self) -> [Vec<VoiceEvent>; 3] {
        self.bus.sid.finish_events()
    }

    /// Flush buffered audio and tell the sink the stream is over.
    pub fn finish(&mut self) -> Result<(), EmulationError> {
        self.flush()?;
        self.sink.finish()?;
        Ok(())
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6510 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6510 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SidBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SidBus {
        &mut self.bus
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Samples converted but not yet handed to the sink.
    #[must_use]
    pub fn buffered(&self) -> &[i16] {
        &self.buffer
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// CPU cycles run so far.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Audio frames produced so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Flush and give back the sink.
    pub fn into_sink(mut self) -> Result<S, EmulationError> {
        self.flush()?;
        Ok(self.sink)
    }
}
