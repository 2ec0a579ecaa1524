//! Error types for warden-node

use thiserror::Error;
use warden_authority::AuthorityError;
use warden_store::StoreError;

/// Node-level errors.
///
/// Only configuration and startup problems surface as errors; once the
/// control loop runs, failures are logged and the node keeps going.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Authority client error
    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),
}

/// Errors reported by device drivers during self-test
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Nothing answered on the bus
    #[error("{0} not detected")]
    NotDetected(&'static str),

    /// Device answered but refused the handshake
    #[error("{device} handshake failed: {reason}")]
    Handshake {
        device: &'static str,
        reason: String,
    },
}

/// Errors from a single biometric read. None of them end an attempt.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BiometricError {
    #[error("sensor busy")]
    Busy,

    #[error("image could not be converted to a template")]
    ImageConversion,

    #[error("template search failed with code {0}")]
    Search(u8),
}

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Result type alias for driver self-tests
pub type DeviceResult<T> = Result<T, DeviceError>;
