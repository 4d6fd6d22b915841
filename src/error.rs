//! Error types for the obfuscator.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the obfuscator.
#[derive(Error, Debug)]
pub enum YsnpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {path}: {source}")]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Mapping collision for {kind} \"{name}\": an identity resolved to two names")]
    MappingCollision { kind: &'static str, name: String },
}

impl YsnpError {
    /// Whether the error is confined to a single file, letting the run
    /// continue with the remaining files.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            YsnpError::Parse { .. } | YsnpError::FileIo { .. } | YsnpError::Io(_)
        )
    }
}

/// Result type alias for obfuscator operations.
pub type Result<T> = std::result::Result<T, YsnpError>;
