//! Headless Commodore 64 sound core.
//!
//! A 6510, one CIA and a SID share a flat 64K bus and run in cycle
//! lockstep under [`EmulationClock`]. The SID produces one audio sample
//! per `cpu_frequency / sample_rate` cycles; samples are buffered and
//! handed to an [`AudioSink`]. [`Player`] drives PSID tunes on top.

mod bus;
mod clock;
pub mod config;
mod error;
mod player;
pub mod sink;
mod wav;

pub use bus::{CIA_BASE, SID_BASE, SID_LAST, SidBus};
pub use clock::{EmulationClock, Vector, to_pcm};
pub use config::{ConfigError, RegisterPolicy, SessionConfig};
pub use error::EmulationError;
pub use player::{KERNAL_TIMER_LATCH, Player};
pub use sink::{AudioSink, MemorySink, NullSink, SinkError};
pub use wav::WavSink;
