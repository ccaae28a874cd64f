//! Switcher wire protocols.
//!
//! Each supported switch family speaks its own line protocol. A
//! [`Protocol`] implementation owns the byte-level encoding of tie
//! commands and the classification of reply lines; it carries no
//! connection state and never touches the transport itself.

pub mod extron;
pub mod lightware;

use std::sync::Arc;

use matrixkit_core::{Tie, Verdict};

pub use extron::ExtronProtocol;
pub use lightware::LightwareProtocol;

/// Factory-default device address shared by both switch families.
pub const DEFAULT_IP: [u8; 4] = [192, 168, 254, 254];

/// Factory-default serial baud rate.
pub const DEFAULT_BAUD: u32 = 9600;

/// Factory-default serial framing code: 8 data bits, no parity, 1 stop bit.
pub const DEFAULT_FRAME: u16 = 801;

/// A switch family's command syntax.
pub trait Protocol: Send + Sync {
    /// Numeric id used in connection directives and the config file.
    fn id(&self) -> u8;

    /// Human-readable protocol name for help output.
    fn name(&self) -> &'static str;

    /// TCP port the device listens on out of the box.
    fn default_port(&self) -> u16;

    /// Encode a single tie command.
    fn encode_single(&self, tie: Tie) -> Vec<u8>;

    /// Encode a batch of ties as one transmission.
    ///
    /// The default is a run of single-tie frames; protocols with a
    /// dedicated batch syntax override this.
    fn encode_multi(&self, ties: &[Tie]) -> Vec<u8> {
        let mut frame = Vec::new();
        for tie in ties {
            frame.extend_from_slice(&self.encode_single(*tie));
        }
        frame
    }

    /// Verdict to assume as soon as the transport is open.
    ///
    /// `None` means the link only counts as up once a reply line says
    /// so. Protocols without a login handshake return `Some(Success)`.
    fn on_connect(&self) -> Option<Verdict> {
        None
    }

    /// Classify one complete reply line.
    ///
    /// Returns `None` for lines that say nothing about the last command.
    fn on_receive(&self, line: &[u8]) -> Option<Verdict>;
}

/// All protocols this build knows, ordered by id.
pub fn all_protocols() -> Vec<Arc<dyn Protocol>> {
    vec![
        Arc::new(LightwareProtocol) as Arc<dyn Protocol>,
        Arc::new(ExtronProtocol),
    ]
}

/// Look up a protocol by the id used in connection directives.
pub fn protocol_for_id(id: u64) -> Option<Arc<dyn Protocol>> {
    all_protocols().into_iter().find(|p| u64::from(p.id()) == id)
}
