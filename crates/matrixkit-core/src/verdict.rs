//! Shared verdict cell between the reader task and command senders.

use parking_lot::Mutex;

/// Outcome of the most recent exchange with the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// No decisive reply seen yet.
    #[default]
    Pending,
    /// The device acknowledged the exchange.
    Success,
    /// The device rejected the exchange.
    Error,
}

/// A locked verdict cell.
///
/// The sender clears the slot before each transmission, the reader task
/// stores whatever the protocol makes of incoming lines, and the sender
/// polls until the slot is decisive or its timeout runs out.
#[derive(Debug, Default)]
pub struct VerdictSlot {
    inner: Mutex<Verdict>,
}

impl VerdictSlot {
    /// Create a slot holding `Pending`
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the slot to `Pending`
    pub fn clear(&self) {
        *self.inner.lock() = Verdict::Pending;
    }

    /// Store a verdict
    pub fn set(&self, verdict: Verdict) {
        *self.inner.lock() = verdict;
    }

    /// Read the current verdict
    pub fn get(&self) -> Verdict {
        *self.inner.lock()
    }
}
