//! # Matrixkit Communication
//!
//! Switcher wire protocols and the transports that carry them.
//! A [`Connection`] binds one [`Protocol`] to one [`Communicator`] and
//! handles reconnects, reply parsing and acknowledgement timeouts.

pub mod communication;
pub mod connection;
pub mod protocol;

#[cfg(feature = "serial")]
pub use communication::SerialCommunicator;
pub use communication::{build_communicator, connection_usage, Communicator, TcpCommunicator};
pub use connection::{Connection, MAX_COMMAND_TIMEOUT, MAX_CONNECT_TIMEOUT, POLL_INTERVAL};
pub use protocol::{
    all_protocols, protocol_for_id, DEFAULT_BAUD, DEFAULT_FRAME, DEFAULT_IP, ExtronProtocol,
    LightwareProtocol, Protocol,
};
