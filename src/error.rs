//! Error types for parthash
//!
//! Hashing failures are never swallowed by the core: an I/O failure or a
//! cancellation abandons the computation and no partial tree is returned.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for parthash operations
#[derive(Error, Debug)]
pub enum PartHashError {
    /// The byte source failed before the declared size was consumed
    #[error("I/O failure at byte offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Cooperative cancellation was observed between buffer reads
    #[error("Hashing cancelled")]
    Cancelled,

    /// A file could not be opened or inspected
    #[error("Cannot open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted tree or manifest could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A tree or manifest could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// A part index beyond the layout was requested
    #[error("Part {index} out of range (file has {parts} parts)")]
    PartOutOfRange { index: u64, parts: u64 },
}

impl PartHashError {
    /// Create an I/O failure at the given byte offset
    pub fn io_at(offset: u64, source: std::io::Error) -> Self {
        Self::Io { offset, source }
    }

    /// Create an open error with path context
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Check if this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Byte offset reached when the source failed, if any
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Io { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Open { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for parthash operations
pub type Result<T> = std::result::Result<T, PartHashError>;

impl From<serde_json::Error> for PartHashError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            PartHashError::Encode(err.to_string())
        } else {
            PartHashError::Decode(err.to_string())
        }
    }
}

impl From<bincode::Error> for PartHashError {
    fn from(err: bincode::Error) -> Self {
        PartHashError::Decode(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| PartHashError::open(path, e))
    }
}
