//! Error types for warden-store

use thiserror::Error;
use warden_types::TypesError;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file could not be opened, read or written
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Backing store refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A persisted line could not be decoded
    #[error("malformed line {line_no} in {path}: {source}")]
    Malformed {
        path: String,
        line_no: usize,
        #[source]
        source: TypesError,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
