//! Error types for the session logger
//!
//! Only filesystem and serialization failures are errors. Malformed upstream
//! events are recovered inside the classifier and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for logger operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Errors raised by the log store, the logger and the read-back helpers
#[derive(Error, Debug)]
pub enum LogError {
    /// Filesystem failure while touching a log file or directory
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized to a JSON line
    #[error("Failed to serialize record for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A line in a log file is not a valid record
    #[error("Failed to parse record at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// YAML export failure
    #[error("Failed to export transcript as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("Invalid logger configuration: {0}")]
    InvalidConfig(String),
}

impl LogError {
    /// Create an I/O error for the given operation and path
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error pointing at a 1-based line number
    pub fn parse(path: impl Into<PathBuf>, line: usize, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            source,
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error came from the filesystem
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
