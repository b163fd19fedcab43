//! SID error type.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SidError {
    /// Register offset outside the 29-byte window.
    #[error("unsupported SID register ${0:02X}")]
    UnsupportedRegister(u8),
}
