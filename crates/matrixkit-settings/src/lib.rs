//! Matrixkit Settings Crate
//!
//! Keeps the connection line and the macro table across runs. The
//! configuration file is itself a command script, so loading it means
//! replaying its lines through the interpreter.

pub mod config;

pub use config::{ConfigFile, DEFAULT_CONFIG_FILE};
