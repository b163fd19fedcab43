//! Session-level error type.

use format_psid::PsidError;
use mos_6510::CpuError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::sink::SinkError;

/// Everything that can stop an emulation session.
///
/// CPU and register errors surface at a `step()` boundary, after the
/// instruction that caused them has completed. Loader and config errors
/// surface before the first step.
#[derive(Debug, Error)]
pub enum EmulationError {
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error("unsupported register access at ${address:04X}")]
    UnsupportedRegister { address: u16 },
    #[error("{len}-byte image at ${address:04X} runs past $FFFF")]
    AddressOutOfRange { address: u16, len: usize },
    #[error("malformed input: {0}")]
    MalformedInput(#[from] PsidError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
