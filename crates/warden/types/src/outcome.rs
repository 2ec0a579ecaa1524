//! Result of one scan cycle

use crate::records::CredentialRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a scan was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    /// Not in the cache, and the server could not vouch for it.
    UnknownCredential,
    /// Every biometric window expired without a match.
    BiometricMismatch,
}

impl DenyReason {
    /// Second display line shown under "Access Denied".
    pub fn panel_text(&self) -> &'static str {
        match self {
            DenyReason::UnknownCredential => "Invalid Card",
            DenyReason::BiometricMismatch => "Fingerprint Failed",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::UnknownCredential => write!(f, "unknown credential"),
            DenyReason::BiometricMismatch => write!(f, "biometric mismatch"),
        }
    }
}

/// Decision produced by the orchestrator for one presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Granted(CredentialRecord),
    Denied(DenyReason),
}

impl Outcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Outcome::Granted(_))
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Outcome::Granted(_) => None,
            Outcome::Denied(reason) => Some(*reason),
        }
    }
}
