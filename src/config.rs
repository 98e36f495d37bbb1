//! Relay configuration parsing, validation, and environment overrides.

use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::queue::MAX_QUEUE_CAPACITY;
use crate::{AppError, Result};

/// Environment variable overriding [`RelayConfig::port`].
pub const PORT_ENV: &str = "COMMAND_RELAY_PORT";

/// Environment variable overriding [`RelayConfig::queue_capacity`].
pub const QUEUE_CAPACITY_ENV: &str = "COMMAND_RELAY_QUEUE_CAPACITY";

/// Synthetic producer settings.
///
/// When enabled, the relay inserts each configured command into the queue
/// after waiting `interval_seconds`, as if a producer had sent it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DemoConfig {
    /// Whether the demo producer runs.
    #[serde(default)]
    pub enabled: bool,
    /// Delay before each inserted command.
    #[serde(default = "default_demo_interval")]
    pub interval_seconds: u64,
    /// Commands inserted in order.
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_demo_interval(),
            commands: Vec::new(),
        }
    }
}

fn default_demo_interval() -> u64 {
    20
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    6666
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_max_line_bytes() -> usize {
    1_048_576
}

/// Relay configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RelayConfig {
    /// Address the listener binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port the listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of commands held in the queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Longest accepted line, in bytes, excluding the terminator.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Synthetic producer.
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            queue_capacity: default_queue_capacity(),
            max_line_bytes: default_max_line_bytes(),
            demo: DemoConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COMMAND_RELAY_*` environment overrides and re-validate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an override is set but unparsable, or
    /// if the resulting configuration is invalid.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(port) = env_override::<u16>(PORT_ENV)? {
            info!(port, "port overridden from environment");
            self.port = port;
        }
        if let Some(capacity) = env_override::<usize>(QUEUE_CAPACITY_ENV)? {
            info!(capacity, "queue capacity overridden from environment");
            self.queue_capacity = capacity;
        }
        self.validate()
    }

    /// Socket address the listener binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` is not an IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|err| AppError::Config(format!("invalid host '{}': {err}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(AppError::Config(
                "queue_capacity must be greater than zero".into(),
            ));
        }

        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(AppError::Config(format!(
                "queue_capacity must not exceed {MAX_QUEUE_CAPACITY}"
            )));
        }

        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }

        self.listen_addr()?;

        if self.demo.enabled {
            if self.demo.interval_seconds == 0 {
                return Err(AppError::Config(
                    "demo.interval_seconds must be greater than zero".into(),
                ));
            }
            if self.demo.commands.is_empty() {
                return Err(AppError::Config(
                    "demo.commands must not be empty when demo is enabled".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Read and parse an optional environment override.
fn env_override<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| AppError::Config(format!("invalid {key} '{raw}': {err}"))),
        Err(_) => Ok(None),
    }
}
