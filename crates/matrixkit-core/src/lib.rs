//! # Matrixkit Core
//!
//! Core types and utilities for Matrixkit.
//! Provides the error taxonomy, crosspoint routing types and the
//! verdict cell shared between reader tasks and command senders.

pub mod error;
pub mod types;
pub mod verdict;

pub use error::{CommandError, ConnectionError, Error, Result};
pub use types::{RouteMap, Tie};
pub use verdict::{Verdict, VerdictSlot};
