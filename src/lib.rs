//! # grblbridge
//!
//! A serial bridge daemon for GRBL-class CNC controllers:
//! - Flow-controlled command pipeline with strict one-in-flight dispatch
//! - Line-oriented decoder for the controller's reply grammars
//! - Position/jog arithmetic with unit conversion and travel clamping
//! - Optional hardware jog pendant on a second serial port
//!
//! ## Architecture
//!
//! grblbridge is organized as a workspace:
//!
//! 1. **grblbridge-core** - data model, events, errors, units
//! 2. **grblbridge-communication** - serial links, GRBL decoding, sessions
//! 3. **grblbridge** - the daemon binary that wires everything together
//!
//! Web clients and any other front end are external collaborators: they
//! drive [`DeviceSession`] operations and consume its event broadcasts.

pub mod config;

pub use config::Config;

pub use grblbridge_core::{
    Axis, ConsoleMode, DeviceEvent, Error, EventBus, MachineStateEvent, Result, SubscriptionId,
    TravelConvention,
};

pub use grblbridge_communication::{
    list_ports, ConnectionParams, DeviceOptions, DeviceSession, JoggerSession,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with console output and RUST_LOG
/// environment variable support.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
