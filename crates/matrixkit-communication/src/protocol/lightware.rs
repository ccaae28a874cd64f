//! Lightware LW1 protocol.
//!
//! Ties are switched with `{input@output}` frames terminated by CRLF.
//! The switch acknowledges every command with a parenthesized status
//! line such as `(01 02 03 04)`; there is no explicit error reply, a
//! silent device is the only failure signal.

use matrixkit_core::{Tie, Verdict};

use super::Protocol;

/// Lightware matrix switchers speaking the legacy LW1 syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightwareProtocol;

impl Protocol for LightwareProtocol {
    fn id(&self) -> u8 {
        1
    }

    fn name(&self) -> &'static str {
        "Lightware LW1 Protocol"
    }

    fn default_port(&self) -> u16 {
        10001
    }

    fn encode_single(&self, tie: Tie) -> Vec<u8> {
        format!("{{{}@{}}}\r\n", tie.input, tie.output).into_bytes()
    }

    fn on_connect(&self) -> Option<Verdict> {
        Some(Verdict::Success)
    }

    fn on_receive(&self, line: &[u8]) -> Option<Verdict> {
        if line.first() == Some(&b'(') && line.last() == Some(&b')') {
            Some(Verdict::Success)
        } else {
            None
        }
    }
}
