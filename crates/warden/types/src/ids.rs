//! Strongly-typed identifiers for Warden entities
//!
//! Credential identifiers come off the reader as raw bytes and are carried as
//! uppercase hex, two digits per byte. Everything else is an opaque string
//! assigned by the operator or the authority server.

use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a presented credential token, as uppercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialUid(String);

impl CredentialUid {
    /// Build a uid from the raw bytes reported by the reader.
    pub fn from_bytes(bytes: &[u8]) -> TypesResult<Self> {
        if bytes.is_empty() {
            return Err(TypesError::EmptyUid);
        }
        Ok(Self(hex::encode_upper(bytes)))
    }

    /// Parse a uid from its hex form. Lowercase digits are normalized.
    pub fn parse(value: &str) -> TypesResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyUid);
        }
        if trimmed.len() % 2 != 0 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypesError::InvalidUid(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes the uid was read from.
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Short form for the 16-column display: first 12 digits and an ellipsis.
    pub fn display_form(&self) -> String {
        if self.0.len() > 12 {
            format!("{}...", &self.0[..12])
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for CredentialUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CredentialUid {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CredentialUid {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CredentialUid> for String {
    fn from(uid: CredentialUid) -> Self {
        uid.0
    }
}

/// Identifier of this node as known to the authority server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the person a credential belongs to, assigned by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Milliseconds of device uptime.
///
/// This is the only clock the node has. Values from different devices, or
/// from before and after a reboot, are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UptimeMillis(pub u64);

impl UptimeMillis {
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UptimeMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UptimeMillis {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypesError::InvalidTimestamp(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_from_bytes_pads_and_uppercases() {
        let uid = CredentialUid::from_bytes(&[0x04, 0xa1, 0xb2, 0x0c]).unwrap();
        assert_eq!(uid.as_str(), "04A1B20C");
        assert_eq!(uid.byte_len(), 4);
    }

    #[test]
    fn test_uid_parse_normalizes_case() {
        let uid: CredentialUid = "04a1b2c3".parse().unwrap();
        assert_eq!(uid.to_string(), "04A1B2C3");
    }

    #[test]
    fn test_uid_parse_rejects_garbage() {
        assert!(matches!(CredentialUid::parse(""), Err(TypesError::EmptyUid)));
        assert!(matches!(
            CredentialUid::parse("04A1B"),
            Err(TypesError::InvalidUid(_))
        ));
        assert!(matches!(
            CredentialUid::parse("04A1,2C3"),
            Err(TypesError::InvalidUid(_))
        ));
    }

    #[test]
    fn test_uid_display_form_truncates_long_uids() {
        let short = CredentialUid::parse("04A1B2C3").unwrap();
        assert_eq!(short.display_form(), "04A1B2C3");

        let long = CredentialUid::parse("04A1B2C3D4E5F6").unwrap();
        assert_eq!(long.display_form(), "04A1B2C3D4E5...");
    }

    #[test]
    fn test_uid_serde_uses_plain_string() {
        let uid = CredentialUid::parse("04a1b2c3").unwrap();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"04A1B2C3\"");

        let bad: Result<CredentialUid, _> = serde_json::from_str("\"zz\"");
        assert!(bad.is_err());
    }
}
