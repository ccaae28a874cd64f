//! Transports that carry a protocol to the device.
//!
//! A [`Communicator`] is a byte pipe with explicit connect/disconnect
//! lifecycle. Transports are protocol-agnostic; the only thing they
//! take from the protocol is its default TCP port.
//!
//! Each transport decides from the shape of the connection parameters
//! whether they are meant for it. [`build_communicator`] walks the
//! transports in registration order and returns the first one that
//! accepts them.

#[cfg(feature = "serial")]
pub mod serial;
pub mod tcp;

use std::time::Duration;

use matrixkit_core::{ConnectionError, Result};

use crate::protocol::Protocol;

#[cfg(feature = "serial")]
pub use serial::{SerialCommunicator, SerialFrame};
pub use tcp::TcpCommunicator;

/// Read timeout for polling receives.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Upper bound for a blocking write.
pub(crate) const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A connected byte pipe to the switch.
pub trait Communicator: Send {
    /// Open the transport. A no-op when already connected.
    fn connect(&mut self, timeout: Duration) -> Result<()>;

    /// Close the transport. Shutdown errors are swallowed.
    fn disconnect(&mut self) -> Result<()>;

    /// Whether the transport currently holds an open handle.
    fn is_connected(&self) -> bool;

    /// Write some bytes, returning how many were accepted.
    fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Read whatever is pending.
    ///
    /// Returns an empty buffer when nothing arrived within the read
    /// timeout; errors are reserved for hard transport faults.
    fn receive(&mut self) -> Result<Vec<u8>>;

    /// Push buffered output to the wire.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable connection target for status lines.
    fn describe(&self) -> String;
}

/// Build the first transport whose parameter shape matches.
///
/// `params` is the connection directive with the protocol id already
/// stripped. Transports that find the parameters unsuitable are skipped;
/// when every transport declines, the last refusal is reported.
pub fn build_communicator(
    protocol: &dyn Protocol,
    params: &[u64],
) -> Result<Box<dyn Communicator>> {
    match TcpCommunicator::from_params(params, protocol.default_port()) {
        Ok(tcp) => return Ok(Box::new(tcp)),
        Err(e) if e.is_unsuitable() => {
            tracing::debug!("TCP declined {:?}: {}", params, e);
        }
        Err(e) => return Err(e),
    }

    #[cfg(feature = "serial")]
    match SerialCommunicator::from_params(params) {
        Ok(serial) => return Ok(Box::new(serial)),
        Err(e) if e.is_unsuitable() => {
            tracing::debug!("serial declined {:?}: {}", params, e);
        }
        Err(e) => return Err(e),
    }

    Err(ConnectionError::Unsuitable {
        reason: "no connection type accepts these parameters".to_string(),
    }
    .into())
}

/// Usage lines for the connection help text, one per transport.
pub fn connection_usage() -> Vec<&'static str> {
    #[cfg_attr(not(feature = "serial"), allow(unused_mut))]
    let mut usage = vec![tcp::USAGE];
    #[cfg(feature = "serial")]
    usage.push(serial::USAGE);
    usage
}
