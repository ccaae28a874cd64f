//! TCP transport.
//!
//! Both switch families ship with an Ethernet interface listening on a
//! vendor-specific port. Connection parameters are the four address
//! octets, optionally followed by a port; with no parameters at all the
//! factory-default address is used.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use matrixkit_core::{ConnectionError, Result};

use super::{Communicator, READ_TIMEOUT, WRITE_TIMEOUT};
use crate::protocol::DEFAULT_IP;

/// Parameter shape shown in the connection help.
pub const USAGE: &str = "[192.168.x.y[,port]] - TCP connection";

/// TCP connection to a switch.
#[derive(Debug)]
pub struct TcpCommunicator {
    addr: SocketAddrV4,
    stream: Option<TcpStream>,
}

impl TcpCommunicator {
    /// Interpret connection parameters as a TCP target.
    ///
    /// Accepts an empty list (factory defaults), four address octets, or
    /// four octets plus a port. Anything else is unsuitable for this
    /// transport.
    pub fn from_params(params: &[u64], default_port: u16) -> Result<Self> {
        if !matches!(params.len(), 0 | 4 | 5) {
            return Err(unsuitable(format!(
                "expected 0, 4 or 5 TCP parameters, got {}",
                params.len()
            )));
        }

        let octets = if params.len() >= 4 {
            let mut octets = [0u8; 4];
            for (slot, &value) in octets.iter_mut().zip(params) {
                *slot = u8::try_from(value)
                    .map_err(|_| unsuitable(format!("address octet {} out of range", value)))?;
            }
            octets
        } else {
            DEFAULT_IP
        };

        let port = match params.get(4) {
            Some(&value) => match u16::try_from(value) {
                Ok(port) if port > 0 => port,
                _ => return Err(unsuitable(format!("port {} out of range", value))),
            },
            None => default_port,
        };

        Ok(Self {
            addr: SocketAddrV4::new(Ipv4Addr::from(octets), port),
            stream: None,
        })
    }
}

impl Communicator for TcpCommunicator {
    fn connect(&mut self, timeout: Duration) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let addr = SocketAddr::V4(self.addr);
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            ConnectionError::ConnectFailed {
                reason: format!("{}: {}", self.addr, e),
            }
        })?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // Peer may have closed already; nothing to do about it here.
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => Ok(stream.write(data)?),
            None => Err(not_connected()),
        }
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(not_connected()),
        };
        let mut buf = [0u8; 1024];
        match stream.read(&mut buf) {
            Ok(0) => Err(ConnectionError::Io {
                reason: "connection closed by peer".to_string(),
            }
            .into()),
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.addr.to_string()
    }
}

fn unsuitable(reason: String) -> matrixkit_core::Error {
    ConnectionError::Unsuitable { reason }.into()
}

fn not_connected() -> matrixkit_core::Error {
    ConnectionError::Io {
        reason: "not connected".to_string(),
    }
    .into()
}
