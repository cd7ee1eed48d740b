//! Error types for the MLLP transport layer.

use std::time::Duration;
use thiserror::Error;

/// Transport-level failures surfaced to callers.
///
/// Only genuine connection failures live here. An acknowledgment timeout, a
/// partially received frame, or undecodable bytes in a payload are all normal
/// outcomes of the protocol and are represented in the respective APIs
/// instead of as errors.
#[derive(Debug, Error)]
pub enum MllpError {
    /// I/O failure while connecting, reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection attempt did not complete within the configured timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
}

/// Result type alias using [`MllpError`].
pub type Result<T> = std::result::Result<T, MllpError>;
