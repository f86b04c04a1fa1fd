//! Unified error type for the radiomix-lib crate.
//!
//! [`RadiomixError`] wraps tool invocation failures ([`ToolError`]) and the
//! domain error kinds (`NotFound`, `SnapshotMissing`, `Config`, `Json`).
//! `From` impls let `?` cross module boundaries.

use std::fmt;
use std::path::PathBuf;

use crate::tool::ToolError;

/// Unified error type for radiomix-lib operations.
#[derive(Debug)]
pub enum RadiomixError {
    /// An external tool (`amixer`, `alsactl`, `systemctl`) failed.
    Tool(ToolError),
    /// A directly requested control is absent or unrepresentable.
    NotFound(String),
    /// Restore was requested but no snapshot exists yet.
    SnapshotMissing(PathBuf),
    /// Standard I/O error (config persistence, data dir creation).
    Io(std::io::Error),
    /// Configuration error.
    Config(String),
    /// JSON encode/decode error.
    Json(String),
}

impl RadiomixError {
    /// Raw diagnostic text for tool failures, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            RadiomixError::Tool(e) => Some(e.diagnostic()),
            _ => None,
        }
    }
}

impl fmt::Display for RadiomixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadiomixError::Tool(e) => write!(f, "{e}"),
            RadiomixError::NotFound(name) => write!(f, "Control not found: {name}"),
            RadiomixError::SnapshotMissing(path) => {
                write!(f, "No saved snapshot at {}", path.display())
            }
            RadiomixError::Io(e) => write!(f, "I/O error: {e}"),
            RadiomixError::Config(e) => write!(f, "Config error: {e}"),
            RadiomixError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for RadiomixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RadiomixError::Tool(e) => Some(e),
            RadiomixError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ToolError> for RadiomixError {
    fn from(e: ToolError) -> Self {
        RadiomixError::Tool(e)
    }
}

impl From<std::io::Error> for RadiomixError {
    fn from(e: std::io::Error) -> Self {
        RadiomixError::Io(e)
    }
}

impl From<serde_json::Error> for RadiomixError {
    fn from(e: serde_json::Error) -> Self {
        RadiomixError::Json(e.to_string())
    }
}

/// Crate-level Result alias using [`RadiomixError`].
pub type Result<T> = std::result::Result<T, RadiomixError>;
