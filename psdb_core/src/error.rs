//! Error types for psdb_core.

use crate::hash::Hash;
use crate::kind::ResourceKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using psdb_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during store, decode and prune operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Record file is corrupted or invalid.
    #[error("Corrupted record at {path}: {reason}")]
    CorruptedRecord { path: PathBuf, reason: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Record not found in store.
    #[error("{kind} record not found: {hash}")]
    RecordNotFound { kind: ResourceKind, hash: Hash },

    /// Store is invalid or not initialized.
    #[error("Invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// Write attempted on a store opened read-only.
    #[error("Store at {path} is opened read-only")]
    ReadOnly { path: PathBuf },

    /// A record payload could not be decoded into a state document.
    #[error("Decode error: {reason}")]
    Decode { reason: String },

    /// Payload compression or decompression failed.
    #[error("Compression error: {reason}")]
    Compression { reason: String },

    /// Unknown resource kind tag or name.
    #[error("Unknown resource kind: {kind}")]
    UnknownKind { kind: String },

    /// Unsupported record or document format version.
    #[error("Unsupported {what} version: {version}")]
    UnsupportedVersion { what: &'static str, version: u64 },
}

impl Error {
    /// Create a CorruptedRecord error.
    pub fn corrupted_record(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create a RecordNotFound error.
    pub fn record_not_found(kind: ResourceKind, hash: Hash) -> Self {
        Error::RecordNotFound { kind, hash }
    }

    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a ReadOnly error.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Error::ReadOnly { path: path.into() }
    }

    /// Create a Decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }

    /// Create a Compression error.
    pub fn compression_error(reason: impl Into<String>) -> Self {
        Error::Compression {
            reason: reason.into(),
        }
    }

    /// Create an UnknownKind error.
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Error::UnknownKind { kind: kind.into() }
    }

    /// Whether this error means the record is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RecordNotFound { .. })
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode {
            reason: err.to_string(),
        }
    }
}
