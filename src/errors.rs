//! Error types shared across the gateway.

use std::fmt::{Display, Formatter};

/// Shared gateway result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Gateway error enumeration covering all failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Registry file could not be read, parsed, or validated.
    Config(String),
    /// Requested child is not present in the registry.
    NotFound(String),
    /// Child process or transport could not be created.
    Launch(String),
    /// Protocol handshake with a child failed.
    Handshake(String),
    /// Protocol handshake did not complete within the bound.
    HandshakeTimeout(String),
    /// Tool or schema call did not complete within the bound.
    Timeout(String),
    /// Mid-call failure on an open transport.
    Transport(String),
    /// Caller-supplied parameter failed validation.
    Validation(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Gateway endpoint or serialization failure.
    Mcp(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Launch(msg) => write!(f, "launch: {msg}"),
            Self::Handshake(msg) => write!(f, "handshake: {msg}"),
            Self::HandshakeTimeout(msg) => write!(f, "handshake timeout: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Mcp(msg) => write!(f, "mcp: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid toml: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid json: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
