//! Serial transport.
//!
//! Switches with an RS-232 console take the same tie commands over a
//! serial line. Connection parameters are a numeric port id, optionally
//! a baud rate, and the framing either as a packed three-digit
//! `<bits><parity><stop>` code (801 = 8 data bits, no parity, 1 stop
//! bit) or spelled out as three separate values.

use std::io::{self, Read, Write};
use std::time::Duration;

use matrixkit_core::{ConnectionError, Result};

use super::{Communicator, READ_TIMEOUT};
use crate::protocol::{DEFAULT_BAUD, DEFAULT_FRAME};

/// Parameter shape shown in the connection help.
pub const USAGE: &str = "port[,baud[,<bits><parity><stop>]] - serial connection";

/// Trait for serial port I/O operations
trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Character framing for a serial link.
///
/// Parity and stop bits use the directive's digit encoding: parity
/// 0/1/2 = none/odd/even, stop bits 2 = two, anything else = one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialFrame {
    /// Data bits per character, 7 or 8.
    pub data_bits: u8,
    /// Parity digit, 0 to 2.
    pub parity: u8,
    /// Stop bit digit, 0 to 2.
    pub stop_bits: u8,
}

impl SerialFrame {
    /// Decode a packed three-digit framing code such as 801.
    pub fn from_code(code: u64) -> Result<Self> {
        if code > 999 {
            return Err(unsuitable(format!("framing code {} has too many digits", code)));
        }
        SerialFrame {
            data_bits: ((code / 100) % 10) as u8,
            parity: ((code / 10) % 10) as u8,
            stop_bits: (code % 10) as u8,
        }
        .validated()
    }

    fn validated(self) -> Result<Self> {
        if !(7..=8).contains(&self.data_bits) {
            return Err(unsuitable(format!("{} data bits not supported", self.data_bits)));
        }
        if self.parity > 2 {
            return Err(unsuitable(format!("parity digit {} not supported", self.parity)));
        }
        if self.stop_bits > 2 {
            return Err(unsuitable(format!(
                "stop bit digit {} not supported",
                self.stop_bits
            )));
        }
        Ok(self)
    }
}

/// Serial connection to a switch.
pub struct SerialCommunicator {
    port_name: String,
    baud: u32,
    frame: SerialFrame,
    port: Option<Box<dyn ReadWrite>>,
}

impl SerialCommunicator {
    /// Interpret connection parameters as a serial target.
    ///
    /// Accepts one parameter (port id), two (plus baud), three (plus a
    /// packed framing code) or five (framing spelled out). Anything else
    /// is unsuitable for this transport.
    pub fn from_params(params: &[u64]) -> Result<Self> {
        if !matches!(params.len(), 1 | 2 | 3 | 5) {
            return Err(unsuitable(format!(
                "expected 1, 2, 3 or 5 serial parameters, got {}",
                params.len()
            )));
        }

        let baud = match params.get(1) {
            Some(&value) => {
                if value < 300 {
                    return Err(unsuitable(format!("baud rate {} too low", value)));
                }
                u32::try_from(value)
                    .map_err(|_| unsuitable(format!("baud rate {} out of range", value)))?
            }
            None => DEFAULT_BAUD,
        };

        let frame = match params.len() {
            5 => SerialFrame {
                data_bits: digit(params[2], "data bits")?,
                parity: digit(params[3], "parity")?,
                stop_bits: digit(params[4], "stop bits")?,
            }
            .validated()?,
            3 => SerialFrame::from_code(params[2])?,
            _ => SerialFrame::from_code(u64::from(DEFAULT_FRAME))?,
        };

        Ok(Self {
            port_name: port_name_for_id(params[0]),
            baud,
            frame,
            port: None,
        })
    }
}

fn digit(value: u64, what: &str) -> Result<u8> {
    if value > 9 {
        return Err(unsuitable(format!("{} value {} is not a digit", what, value)));
    }
    Ok(value as u8)
}

/// Map a numeric port id to the platform's device name.
fn port_name_for_id(id: u64) -> String {
    #[cfg(windows)]
    {
        format!("COM{}", id)
    }
    #[cfg(not(windows))]
    {
        format!("/dev/ttyS{}", id)
    }
}

impl Communicator for SerialCommunicator {
    fn connect(&mut self, _timeout: Duration) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let builder = serialport::new(&self.port_name, self.baud)
            .timeout(READ_TIMEOUT)
            .data_bits(match self.frame.data_bits {
                7 => serialport::DataBits::Seven,
                _ => serialport::DataBits::Eight,
            })
            .parity(match self.frame.parity {
                1 => serialport::Parity::Odd,
                2 => serialport::Parity::Even,
                _ => serialport::Parity::None,
            })
            .stop_bits(match self.frame.stop_bits {
                2 => serialport::StopBits::Two,
                _ => serialport::StopBits::One,
            });

        match builder.open_native() {
            Ok(port) => {
                self.port = Some(Box::new(port));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", self.port_name, e);
                Err(ConnectionError::ConnectFailed {
                    reason: format!("{}: {}", self.port_name, e),
                }
                .into())
            }
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        self.port = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        match self.port.as_mut() {
            Some(port) => Ok(port.write(data)?),
            None => Err(not_connected()),
        }
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let port = match self.port.as_mut() {
            Some(port) => port,
            None => return Err(not_connected()),
        };
        let mut buf = [0u8; 1024];
        match port.read(&mut buf) {
            Ok(0) => Err(ConnectionError::Io {
                reason: "serial port closed".to_string(),
            }
            .into()),
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(port) = self.port.as_mut() {
            port.flush()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let parity = match self.frame.parity {
            1 => 'o',
            2 => 'e',
            _ => 'n',
        };
        format!(
            "{} ({} baud, {}{}{})",
            self.port_name, self.baud, self.frame.data_bits, parity, self.frame.stop_bits
        )
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
