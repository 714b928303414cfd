//! Error taxonomy shared by every loadable component.

use thiserror::Error;

/// Errors raised while configuring memory or restoring machine state
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing magic or malformed header
    #[error("invalid file: {0}")]
    InvalidFile(&'static str),
    /// Truncated or malformed chunk, out-of-range index, bad compressed payload
    #[error("corrupt file: {0}")]
    CorruptFile(&'static str),
    /// Newer format version or an impossible configuration
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    #[error("out of memory")]
    OutOfMemory,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}
