//! # Matrixkit
//!
//! A command line controller for Lightware and Extron DVI/HDMI crossbar
//! video switches. Commands tie inputs to outputs, can be bundled into
//! single character macros, and reach the switch over TCP/IP or a
//! serial line.
//!
//! ## Architecture
//!
//! Matrixkit is organized as a workspace with multiple crates:
//!
//! 1. **matrixkit-core** - Core types, errors and shared state
//! 2. **matrixkit-communication** - Switcher protocols, TCP and serial transports
//! 3. **matrixkit-settings** - Configuration file handling
//! 4. **matrixkit** - Main binary with the interpreter and console

pub mod console;
pub mod controller;

pub use controller::MatrixController;

pub use matrixkit_communication::{Connection, ExtronProtocol, LightwareProtocol, Protocol};
pub use matrixkit_core::{CommandError, ConnectionError, Error, Result, RouteMap, Tie, Verdict};
pub use matrixkit_settings::{ConfigFile, DEFAULT_CONFIG_FILE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support
/// - Output on stderr, keeping stdout free for the console
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
