//! Shared infrastructure for the SIPR crates.
//!
//! Nothing in here knows about SIP. It carries the pieces every binary or
//! test harness built on top of `sipr-tm-core` needs before the first message
//! is processed:
//!
//! - [`logging`]: installs a `tracing` subscriber (plain, compact or JSON)
//! - [`config`]: reads TOML files into any `serde` configuration struct
//! - [`errors`]: the error type both of the above report through

pub mod config;
pub mod errors;
pub mod logging;

pub use errors::types::{Error as InfraError, Result as InfraResult};
pub use logging::setup::{LogFormat, LoggingConfig, parse_log_level, setup_logging};
