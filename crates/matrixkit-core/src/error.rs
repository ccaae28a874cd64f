//! Error handling for Matrixkit
//!
//! Provides error types for all layers of the application:
//! - Connection errors (transport selection, connect, device I/O)
//! - Command errors (interpreter input)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors raised while selecting a transport, opening it,
/// or exchanging commands with the switch.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Connection parameters do not fit this transport
    #[error("Unsuitable connection parameters: {reason}")]
    Unsuitable {
        /// Why the parameters were rejected.
        reason: String,
    },

    /// Opening the transport failed
    #[error("Connect failed: {reason}")]
    ConnectFailed {
        /// Why the transport could not be opened.
        reason: String,
    },

    /// The device did not acknowledge within the command window
    #[error("No reaction from device after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The device explicitly rejected the command
    #[error("Device reports error")]
    Device,

    /// Transport-level I/O failure
    #[error("I/O error: {reason}")]
    Io {
        /// The reason for the I/O error.
        reason: String,
    },
}

/// Command error type
///
/// Represents errors in interpreter input, before anything reaches
/// the device.
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// Command does not match any known form
    #[error("invalid command '{command}': {reason}")]
    Syntax {
        /// The offending command text.
        command: String,
        /// Why the command was rejected.
        reason: String,
    },

    /// Macro expansion exceeded the nesting limit
    #[error("macro expansion too deep at '{name}'")]
    MacroDepth {
        /// The macro whose expansion blew the limit.
        name: char,
    },
}

/// Main error type for Matrixkit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::Timeout { .. }))
    }

    /// Check if this transport declined the connection parameters
    pub fn is_unsuitable(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::Unsuitable { .. }))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
