//! Error types shared across the relay.

use std::fmt::{Display, Formatter};

/// Shared relay result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Relay error enumeration covering every failure mode.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The listening socket could not be bound. Fatal at startup.
    Bind(String),
    /// Socket read/write failure local to one connection.
    Io(String),
    /// Peer violated line framing (over-long line, invalid UTF-8).
    Protocol(String),
    /// The command queue can no longer deliver commands.
    QueueClosed(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Bind(msg) => write!(f, "bind: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::QueueClosed(msg) => write!(f, "queue closed: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
