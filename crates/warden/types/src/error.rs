//! Error types for warden-types

use thiserror::Error;

/// Errors raised while parsing identifiers and persisted records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    /// Reader returned no uid bytes
    #[error("credential uid is empty")]
    EmptyUid,

    /// Uid is not an even-length hex string
    #[error("invalid credential uid: {0}")]
    InvalidUid(String),

    /// Uptime field is not an unsigned integer
    #[error("invalid uptime timestamp: {0}")]
    InvalidTimestamp(String),

    /// Unknown attendance action
    #[error("invalid attendance action: {0}")]
    InvalidAction(String),

    /// Persisted line has the wrong number of fields
    #[error("expected {expected} fields, found {found}: {line}")]
    FieldCount {
        expected: usize,
        found: usize,
        line: String,
    },
}

/// Result type for type-level parsing
pub type TypesResult<T> = Result<T, TypesError>;
