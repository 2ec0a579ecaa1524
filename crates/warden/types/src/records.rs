//! Records owned by the authorization cache and the attendance ledger

use crate::error::{TypesError, TypesResult};
use crate::ids::{CredentialUid, DeviceId, SubjectId, UptimeMillis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity bound to a credential, as confirmed by the authority server.
///
/// Records are append-only: a uid is never rewritten once cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub uid: CredentialUid,
    pub display_name: String,
    pub subject_id: SubjectId,
    pub role: String,
}

impl CredentialRecord {
    pub fn new(
        uid: CredentialUid,
        display_name: impl Into<String>,
        subject_id: SubjectId,
        role: impl Into<String>,
    ) -> Self {
        Self {
            uid,
            display_name: display_name.into(),
            subject_id,
            role: role.into(),
        }
    }
}

/// What an attendance event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceAction {
    Entry,
}

impl AttendanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceAction::Entry => "ENTRY",
        }
    }
}

impl fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceAction {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ENTRY" => Ok(AttendanceAction::Entry),
            other => Err(TypesError::InvalidAction(other.to_string())),
        }
    }
}

/// One granted access, recorded locally and delivered to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Uptime at which access was granted. Restarts at every boot.
    pub sequence: UptimeMillis,
    pub uid: CredentialUid,
    pub display_name: String,
    pub action: AttendanceAction,
    pub device_id: DeviceId,
    /// Set once the server has acknowledged this event.
    #[serde(default)]
    pub delivered: bool,
}

impl AttendanceEvent {
    /// Build an entry event for a granted credential.
    pub fn entry(sequence: UptimeMillis, record: &CredentialRecord, device_id: DeviceId) -> Self {
        Self {
            sequence,
            uid: record.uid.clone(),
            display_name: record.display_name.clone(),
            action: AttendanceAction::Entry,
            device_id,
            delivered: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.delivered
    }
}

/// Ensures a field can be written into a comma-separated line.
pub fn check_field_count(line: &str, found: usize, expected: usize) -> TypesResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(TypesError::FieldCount {
            expected,
            found,
            line: line.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> CredentialRecord {
        CredentialRecord::new(
            CredentialUid::parse("04A1B2C3").unwrap(),
            "Alice",
            SubjectId::new("U1"),
            "student",
        )
    }

    #[test]
    fn test_entry_event_copies_identity() {
        let event = AttendanceEvent::entry(UptimeMillis(1500), &alice(), DeviceId::new("ESP32_001"));
        assert_eq!(event.uid.as_str(), "04A1B2C3");
        assert_eq!(event.display_name, "Alice");
        assert_eq!(event.action, AttendanceAction::Entry);
        assert!(event.is_pending());
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("ENTRY".parse::<AttendanceAction>(), Ok(AttendanceAction::Entry));
        assert!("EXIT".parse::<AttendanceAction>().is_err());
    }
}
