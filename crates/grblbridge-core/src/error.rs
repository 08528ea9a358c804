//! Error handling for grblbridge
//!
//! Provides error types for the two serial sessions:
//! - Connection errors (link open/write faults, fatal to the owning session)
//! - Device errors (command pipeline and jog validation)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::data::Axis;
use thiserror::Error;

/// Serial connection error type
///
/// Represents faults on a serial link. These are fatal to the session that
/// owns the link and are surfaced to subscribers as a status event rather
/// than retried silently.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The serial port could not be opened
    #[error("Failed to open port {port}: {reason}")]
    OpenFailed {
        /// The port path that failed to open.
        port: String,
        /// The underlying failure description.
        reason: String,
    },

    /// A write to the serial link failed
    #[error("Write to {port} failed: {source}")]
    WriteFailed {
        /// The port path the write was directed at.
        port: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No ports matched the configured device
    #[error("Port enumeration failed: {reason}")]
    EnumerationFailed {
        /// The underlying failure description.
        reason: String,
    },
}

/// Device error type
///
/// Represents input faults rejected before anything reaches the command
/// queue. Nothing is transmitted when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Jog requested before the controller reported steps-per-mm and
    /// max-travel for the axis
    #[error("Axis limits for {axis} not yet known; jog refused")]
    AxisLimitsUnknown {
        /// The axis whose limits are unpopulated.
        axis: Axis,
    },

    /// A caller-supplied value failed validation
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected.
        reason: String,
    },
}

/// Top-level error type for grblbridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Serial connection fault.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Device pipeline fault.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Underlying I/O fault.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration fault.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a message
    pub fn other(message: impl Into<String>) -> Self {
        Error::Other(message.into())
    }

    /// Create a configuration error from a message
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

/// Result type alias used throughout grblbridge
pub type Result<T> = std::result::Result<T, Error>;
