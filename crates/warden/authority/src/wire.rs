//! JSON bodies exchanged with the authority server

use serde::{Deserialize, Deserializer, Serialize};
use warden_types::{AttendanceEvent, CredentialRecord, CredentialUid, DeviceId, SubjectId};

/// What the node tells the server about itself at boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub device_id: DeviceId,
    pub device_type: String,
    pub location: String,
    pub firmware_version: String,
    pub features: Vec<String>,
}

/// `POST device/register`
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub device_id: &'a str,
    pub device_type: &'a str,
    pub location: &'a str,
    pub firmware_version: &'a str,
    /// Comma-joined feature list, e.g. `RFID,FINGERPRINT,LCD`
    pub features: String,
}

impl<'a> From<&'a DeviceProfile> for RegisterRequest<'a> {
    fn from(profile: &'a DeviceProfile) -> Self {
        Self {
            device_id: profile.device_id.as_str(),
            device_type: &profile.device_type,
            location: &profile.location,
            firmware_version: &profile.firmware_version,
            features: profile.features.join(","),
        }
    }
}

/// `POST verify-rfid`
#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub rfid_uid: &'a str,
}

/// Body of a 200 answer to `verify-rfid`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub student_name: Option<String>,
    /// Some servers send a numeric id.
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl VerifyResponse {
    /// Identity to cache for `uid`, if the server vouched for it.
    ///
    /// A positive answer without a name is not usable and yields `None`.
    pub fn into_record(self, uid: &CredentialUid) -> Option<CredentialRecord> {
        if !self.success {
            return None;
        }
        let name = self.student_name.filter(|n| !n.trim().is_empty())?;
        Some(CredentialRecord::new(
            uid.clone(),
            name,
            SubjectId::new(self.user_id.unwrap_or_default()),
            self.role.unwrap_or_default(),
        ))
    }
}

/// Where an attendance report comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Sent right after the grant.
    Immediate,
    /// Re-sent from the ledger by a flush.
    Sync,
}

/// One attendance event on its way to the server
#[derive(Debug, Clone)]
pub struct AttendanceReport<'a> {
    pub event: &'a AttendanceEvent,
    pub location: &'a str,
    pub kind: DeliveryKind,
}

/// `POST log-attendance`
#[derive(Debug, Serialize)]
pub struct AttendanceRequest<'a> {
    pub student_name: &'a str,
    pub rfid_uid: &'a str,
    /// Device uptime in milliseconds, as a decimal string
    pub timestamp: String,
    pub device_id: &'a str,
    pub action: &'static str,
    pub location: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
}

impl<'a> From<&AttendanceReport<'a>> for AttendanceRequest<'a> {
    fn from(report: &AttendanceReport<'a>) -> Self {
        let event = report.event;
        Self {
            student_name: &event.display_name,
            rfid_uid: event.uid.as_str(),
            timestamp: event.sequence.to_string(),
            device_id: event.device_id.as_str(),
            action: event.action.as_str(),
            location: report.location,
            synced: match report.kind {
                DeliveryKind::Immediate => None,
                DeliveryKind::Sync => Some(true),
            },
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_types::UptimeMillis;

    fn uid() -> CredentialUid {
        CredentialUid::parse("04A1B2C3").unwrap()
    }

    #[test]
    fn test_verify_response_positive() {
        let resp: VerifyResponse = serde_json::from_value(json!({
            "success": true,
            "student_name": "Alice",
            "user_id": "U1",
            "role": "student",
            "fingerprint_data": null
        }))
        .unwrap();

        let record = resp.into_record(&uid()).unwrap();
        assert_eq!(record.display_name, "Alice");
        assert_eq!(record.subject_id.as_str(), "U1");
        assert_eq!(record.role, "student");
    }

    #[test]
    fn test_verify_response_numeric_user_id() {
        let resp: VerifyResponse = serde_json::from_value(json!({
            "success": true,
            "student_name": "Bob",
            "user_id": 42
        }))
        .unwrap();
        let record = resp.into_record(&uid()).unwrap();
        assert_eq!(record.subject_id.as_str(), "42");
        assert_eq!(record.role, "");
    }

    #[test]
    fn test_verify_response_negative_or_nameless() {
        let negative: VerifyResponse =
            serde_json::from_value(json!({ "success": false, "error": "nope" })).unwrap();
        assert!(negative.into_record(&uid()).is_none());

        let nameless: VerifyResponse =
            serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(nameless.into_record(&uid()).is_none());
    }

    #[test]
    fn test_attendance_request_shape() {
        let record = CredentialRecord::new(uid(), "Alice", SubjectId::new("U1"), "student");
        let event = AttendanceEvent::entry(UptimeMillis(152_300), &record, DeviceId::new("ESP32_001"));

        let immediate = AttendanceReport {
            event: &event,
            location: "Main Entrance",
            kind: DeliveryKind::Immediate,
        };
        let body = serde_json::to_value(AttendanceRequest::from(&immediate)).unwrap();
        assert_eq!(
            body,
            json!({
                "student_name": "Alice",
                "rfid_uid": "04A1B2C3",
                "timestamp": "152300",
                "device_id": "ESP32_001",
                "action": "ENTRY",
                "location": "Main Entrance"
            })
        );

        let synced = AttendanceReport {
            kind: DeliveryKind::Sync,
            ..immediate
        };
        let body = serde_json::to_value(AttendanceRequest::from(&synced)).unwrap();
        assert_eq!(body["synced"], json!(true));
    }

    #[test]
    fn test_register_request_joins_features() {
        let profile = DeviceProfile {
            device_id: DeviceId::new("ESP32_001"),
            device_type: "ESP32_RFID_READER".to_string(),
            location: "Main Entrance".to_string(),
            firmware_version: "1.0.0".to_string(),
            features: vec!["RFID".into(), "FINGERPRINT".into()],
        };
        let body = serde_json::to_value(RegisterRequest::from(&profile)).unwrap();
        assert_eq!(body["features"], json!("RFID,FINGERPRINT"));
        assert_eq!(body["device_type"], json!("ESP32_RFID_READER"));
    }
}
