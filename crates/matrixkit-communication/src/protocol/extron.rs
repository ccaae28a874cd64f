//! Extron DXP SIS protocol.
//!
//! Single ties are switched with bare `input*output!` commands, no
//! terminator. Batches use the "quick multiple tie" form: an escape
//! introducer, the concatenated pairs and a CRLF. The switch replies
//! with lines like `Out2 In1 All` or `Qik`, and greets new connections
//! with a copyright banner followed by a `Login` notice on password
//! protected units.

use matrixkit_core::{Tie, Verdict};

use super::Protocol;

/// Extron DXP series switchers speaking SIS.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtronProtocol;

impl Protocol for ExtronProtocol {
    fn id(&self) -> u8 {
        2
    }

    fn name(&self) -> &'static str {
        "Extron DXP SIS Protocol"
    }

    fn default_port(&self) -> u16 {
        23
    }

    fn encode_single(&self, tie: Tie) -> Vec<u8> {
        format!("{}*{}!", tie.input, tie.output).into_bytes()
    }

    fn encode_multi(&self, ties: &[Tie]) -> Vec<u8> {
        let mut frame = b"\x1b+Q".to_vec();
        for tie in ties {
            frame.extend_from_slice(&self.encode_single(*tie));
        }
        frame.extend_from_slice(b"\r\n");
        frame
    }

    fn on_connect(&self) -> Option<Verdict> {
        Some(Verdict::Success)
    }

    fn on_receive(&self, line: &[u8]) -> Option<Verdict> {
        let line = line.to_ascii_lowercase();
        if line.starts_with(b"login ") || line.starts_with(b"qik") || line.starts_with(b"out") {
            Some(Verdict::Success)
        } else {
            None
        }
    }
}
