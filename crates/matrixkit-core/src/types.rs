//! Crosspoint routing types.

use serde::{Deserialize, Serialize};

/// A single crosspoint route: one input feeding one output.
///
/// Channel numbers are 1-based, the way both switch families count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tie {
    /// Input channel carrying the signal.
    pub input: u32,
    /// Output channel receiving it.
    pub output: u32,
}

impl Tie {
    /// Create a new tie
    pub fn new(input: u32, output: u32) -> Self {
        Self { input, output }
    }
}

/// Accumulates tie assignments from a command line.
///
/// Each output carries at most one route. Assigning an output again
/// replaces its input in place, so within one command the last
/// assignment wins while the batch keeps the order outputs first
/// appeared in.
#[derive(Debug, Default, Clone)]
pub struct RouteMap {
    ties: Vec<Tie>,
}

impl RouteMap {
    /// Create an empty route map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, replacing any earlier route for the same output
    pub fn assign(&mut self, tie: Tie) {
        if let Some(existing) = self.ties.iter_mut().find(|t| t.output == tie.output) {
            existing.input = tie.input;
        } else {
            self.ties.push(tie);
        }
    }

    /// Number of distinct outputs routed so far
    pub fn len(&self) -> usize {
        self.ties.len()
    }

    /// True when nothing has been routed
    pub fn is_empty(&self) -> bool {
        self.ties.is_empty()
    }

    /// The accumulated ties in first-assignment order
    pub fn ties(&self) -> &[Tie] {
        &self.ties
    }

    /// Consume the map, yielding the ties in first-assignment order
    pub fn into_ties(self) -> Vec<Tie> {
        self.ties
    }
}
