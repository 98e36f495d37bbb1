#![forbid(unsafe_code)]

//! Live command relay: many producers push text commands, exactly one
//! consumer drains them in order.

pub mod config;
pub mod demo;
pub mod errors;
pub mod queue;
pub mod relay;
pub mod slot;

pub use config::RelayConfig;
pub use errors::{AppError, Result};

/// Log filter used when `RUST_LOG` is unset: relay events at `info`
/// (per-command events are `debug`), dependencies at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "warn,command_relay=info";
