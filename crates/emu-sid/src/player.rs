//! PSID playback on top of the clock.
//!
//! The player parks the CPU on a `JMP *` loop at the configured driver
//! address, calls the tune's INIT once with the song number in A, then
//! calls PLAY once per frame and lets the CPU idle on the driver loop for
//! the rest of the frame. Tunes with no PLAY address install their own
//! interrupt handler; for those CIA timer A is started at the KERNAL's
//! default rate and interrupts are left enabled after INIT.

use emu_core::{Bus, MasterClock};
use format_psid::{PsidFile, PsidHeader};
use log::{debug, info, warn};
use mos_6510::flags::I;

use crate::clock::{EmulationClock, Vector};
use crate::error::EmulationError;
use crate::sink::{AudioSink, MemorySink};

/// Timer A latch the KERNAL programs for its 60 Hz interrupt on PAL.
pub const KERNAL_TIMER_LATCH: u16 = 0x4025;

pub struct Player<S: AudioSink = MemorySink> {
    clock: EmulationClock<S>,
    header: PsidHeader,
    song: u16,
    driver: u16,
    frame_cycles: u64,
    frames_played: u64,
}

impl<S: AudioSink> Player<S> {
    /// Load `tune` into `clock` and run its INIT for `song` (1-based),
    /// defaulting to the tune's start song.
    ///
    /// # Errors
    ///
    /// Images that do not fit below $FFFF and any error raised while INIT
    /// runs. An INIT that outlives the cycle budget is abandoned with a
    /// warning rather than an error.
    pub fn new(
        mut clock: EmulationClock<S>,
        tune: &PsidFile,
        song: Option<u16>,
    ) -> Result<Self, EmulationError> {
        let header = tune.header.clone();
        let song = song.unwrap_or(header.start_song).clamp(1, header.songs.max(1));
        let driver = clock.config().driver_address;
        let budget = clock.config().init_cycle_budget;

        info!(
            "player: \"{}\" by {} ({}), song {song}/{}",
            header.name, header.author, header.released, header.songs
        );
        info!(
            "player: load ${:04X}-${:04X} init ${:04X} play ${:04X}",
            tune.load_address,
            usize::from(tune.load_address) + tune.payload.len().saturating_sub(1),
            tune.init_address(),
            header.play_address
        );

        clock.load(&tune.payload, tune.load_address)?;
        let [lo, hi] = driver.to_le_bytes();
        clock.load(&[0x4C, lo, hi], driver)?;
        clock.set_entry(driver);

        let irq_driven = header.play_address == 0;
        if irq_driven {
            let [lo, hi] = KERNAL_TIMER_LATCH.to_le_bytes();
            let bus = clock.bus_mut();
            bus.write(0xDC04, lo);
            bus.write(0xDC05, hi);
            bus.write(0xDC0D, 0x81);
            bus.write(0xDC0E, 0x11);
        }

        let song_index = u8::try_from(song - 1).unwrap_or(u8::MAX);
        if !clock.call(tune.init_address(), song_index, driver, budget)? {
            warn!(
                "player: init did not return within {budget} cycles (PC ${:04X})",
                clock.cpu().regs.pc
            );
        }

        if irq_driven {
            if clock.vector(Vector::Irq) == 0 {
                warn!("player: tune has no play address and no IRQ vector");
            }
            clock.cpu_mut().regs.p.clear(I);
        }

        let frame_cycles = if header.uses_cia_timing(song) {
            let timer = clock.bus().cia.timer_a();
            let latch = if timer.control().start {
                timer.latch()
            } else {
                KERNAL_TIMER_LATCH
            };
            u64::from(latch) + 1
        } else {
            let config = clock.config();
            MasterClock::new(u64::from(config.cpu_frequency))
                .ticks_per_frame(u64::from(config.frame_rate))
                .get()
        };
        info!("player: {frame_cycles} cycles per frame");

        Ok(Self {
            clock,
            header,
            song,
            driver,
            frame_cycles,
            frames_played: 0,
        })
    }

    /// Run one player frame: PLAY (if the tune has one), then idle until
    /// the frame's cycles are used up.
    ///
    /// A PLAY call still running from an earlier frame is left to finish;
    /// PLAY is only entered again once the CPU is back on the driver loop.
    pub fn play_frame(&mut self) -> Result<(), EmulationError> {
        let start = self.clock.cycles();
        let play = self.header.play_address;
        if play != 0 {
            if self.clock.cpu().regs.pc != self.driver {
                debug!(
                    "player: play still running at ${:04X}, skipping frame {}",
                    self.clock.cpu().regs.pc,
                    self.frames_played
                );
            } else if !self.clock.call(play, 0, self.driver, self.frame_cycles)? {
                warn!(
                    "player: play routine overran frame {}",
                    self.frames_played
                );
            }
        }
        let spent = self.clock.cycles() - start;
        if spent < self.frame_cycles {
            self.clock.run_cycles(self.frame_cycles - spent)?;
        }
        self.frames_played += 1;
        Ok(())
    }

    /// Play whole frames until `seconds` of CPU time have passed. Returns
    /// the frames played.
    pub fn render_seconds(&mut self, seconds: f64) -> Result<u64, EmulationError> {
        let cpu_frequency = f64::from(self.clock.config().cpu_frequency);
        let target = (seconds.max(0.0) * cpu_frequency) as u64;
        let start_cycles = self.clock.cycles();
        let start_frames = self.frames_played;
        while self.clock.cycles() - start_cycles < target {
            self.play_frame()?;
        }
        Ok(self.frames_played - start_frames)
    }

    #[must_use]
    pub fn song(&self) -> u16 {
        self.song
    }

    #[must_use]
    pub fn header(&self) -> &PsidHeader {
        &self.header
    }

    #[must_use]
    pub fn frame_cycles(&self) -> u64 {
        self.frame_cycles
    }

    #[must_use]
    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }

    #[must_use]
    pub fn clock(&self) -> &EmulationClock<S> {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut EmulationClock<S> {
        &mut self.clock
    }

    #[must_use]
    pub fn into_clock(self) -> EmulationClock<S> {
        self.clock
    }
}
