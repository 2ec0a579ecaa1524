//! Authority client error types

use thiserror::Error;
use warden_types::CredentialUid;

/// Errors talking to the authority server.
///
/// Callers treat every variant the same way: the request did not succeed.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// Connection, DNS or TLS failure
    #[error("HTTP error on {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// No response within the per-call budget
    #[error("{endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        endpoint: &'static str,
        timeout_ms: u64,
    },

    /// Anything other than 200 OK
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// 200 OK with a body that does not parse
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },

    /// Server answered but does not know the credential
    #[error("credential {0} rejected by server")]
    Rejected(CredentialUid),

    /// Client could not be constructed
    #[error("configuration error: {0}")]
    Config(String),

    /// Server cannot be reached at all (used by offline stand-ins)
    #[error("authority unreachable")]
    Unreachable,
}

impl AuthorityError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthorityError::Timeout { .. })
    }
}

/// Result type for authority calls
pub type AuthorityResult<T> = Result<T, AuthorityError>;
