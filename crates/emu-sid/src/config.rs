//! Session configuration.
//!
//! Every field has a PAL default, so an empty TOML document is a valid
//! config:
//!
//! ```toml
//! cpu_frequency = 985248
//! sample_rate = 44100
//! buffer_capacity = 4096
//! frame_rate = 50
//! driver_address = 0xFFF0
//! register_policy = "warn"
//! init_cycle_budget = 5000000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    #[error("sample rate {sample_rate} Hz exceeds CPU frequency {cpu_frequency} Hz")]
    SampleRateTooHigh { sample_rate: u32, cpu_frequency: u32 },
}

/// What the bus does with an access to an address inside the SID slot
/// that no register decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterPolicy {
    /// Drop writes, read $FF.
    Ignore,
    /// As `Ignore`, plus a warning in the log.
    #[default]
    Warn,
    /// Stop the session at the end of the current step.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// CPU clock in Hz.
    pub cpu_frequency: u32,
    /// Audio output rate in Hz.
    pub sample_rate: u32,
    /// Samples held before the sink sees them.
    pub buffer_capacity: usize,
    /// Player calls per second.
    pub frame_rate: u32,
    /// Where the player parks the CPU between calls.
    pub driver_address: u16,
    pub register_policy: RegisterPolicy,
    /// Cycles a tune's init routine may take before it is abandoned.
    pub init_cycle_budget: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cpu_frequency: 985_248,
            sample_rate: 44_100,
            buffer_capacity: 4096,
            frame_rate: 50,
            driver_address: 0xFFF0,
            register_policy: RegisterPolicy::Warn,
            init_cycle_budget: 5_000_000,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cpu_frequency == 0 {
            return Err(ConfigError::Zero("cpu_frequency"));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Zero("sample_rate"));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Zero("buffer_capacity"));
        }
        if self.frame_rate == 0 {
            return Err(ConfigError::Zero("frame_rate"));
        }
        if self.sample_rate > self.cpu_frequency {
            return Err(ConfigError::SampleRateTooHigh {
                sample_rate: self.sample_rate,
                cpu_frequency: self.cpu_frequency,
            });
        }
        Ok(())
    }
}
