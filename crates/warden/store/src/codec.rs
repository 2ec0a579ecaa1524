//! Comma-separated line formats for persisted records
//!
//! Credential cache: `uid,displayName,subjectId,role`
//! Attendance log:   `timestamp,uid,displayName,action,deviceId`
//!
//! Fields are not quoted. Separators inside a field are replaced with a space
//! on write so every line keeps its field count.

use crate::error::StoreError;
use warden_types::records::check_field_count;
use warden_types::{
    AttendanceEvent, CredentialRecord, CredentialUid, DeviceId, SubjectId, TypesResult,
    UptimeMillis,
};

/// A record that round-trips through one line of a [`LineLog`](crate::LineLog)
pub trait LineCodec: Sized {
    const FIELDS: usize;

    fn encode(&self) -> String;

    fn decode(line: &str) -> TypesResult<Self>;
}

fn clean(field: &str) -> String {
    field
        .chars()
        .map(|c| if matches!(c, ',' | '\n' | '\r') { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn split(line: &str, expected: usize) -> TypesResult<Vec<&str>> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    check_field_count(line, fields.len(), expected)?;
    Ok(fields)
}

impl LineCodec for CredentialRecord {
    const FIELDS: usize = 4;

    fn encode(&self) -> String {
        format!(
            "{},{},{},{}",
            self.uid,
            clean(&self.display_name),
            clean(self.subject_id.as_str()),
            clean(&self.role)
        )
    }

    fn decode(line: &str) -> TypesResult<Self> {
        let f = split(line, Self::FIELDS)?;
        Ok(CredentialRecord {
            uid: CredentialUid::parse(f[0])?,
            display_name: f[1].to_string(),
            subject_id: SubjectId::new(f[2]),
            role: f[3].to_string(),
        })
    }
}

impl LineCodec for AttendanceEvent {
    const FIELDS: usize = 5;

    fn encode(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.sequence,
            self.uid,
            clean(&self.display_name),
            self.action,
            clean(self.device_id.as_str())
        )
    }

    /// Decoded events start undelivered; acknowledgments live in their own log.
    fn decode(line: &str) -> TypesResult<Self> {
        let f = split(line, Self::FIELDS)?;
        Ok(AttendanceEvent {
            sequence: f[0].parse::<UptimeMillis>()?,
            uid: CredentialUid::parse(f[1])?,
            display_name: f[2].to_string(),
            action: f[3].parse()?,
            device_id: DeviceId::new(f[4]),
            delivered: false,
        })
    }
}

/// Decode every line, skipping and logging the ones that do not parse.
pub(crate) fn decode_lines<T: LineCodec>(location: &str, lines: &[String]) -> Vec<T> {
    let mut out = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        match T::decode(line) {
            Ok(record) => out.push(record),
            Err(source) => {
                let err = StoreError::Malformed {
                    path: location.to_string(),
                    line_no: idx + 1,
                    source,
                };
                tracing::warn!(error = %err, "Skipping malformed line");
            }
        }
    }
    out
}
