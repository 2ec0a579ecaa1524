//! Scriptable in-process authority for development and testing

use crate::client::Authority;
use crate::error::{AuthorityError, AuthorityResult};
use crate::wire::{AttendanceReport, DeliveryKind, DeviceProfile};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use warden_types::{CredentialRecord, CredentialUid, DeviceId, UptimeMillis};

/// One `log-attendance` call as seen by the scripted server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedReport {
    pub sequence: UptimeMillis,
    pub uid: CredentialUid,
    pub kind: DeliveryKind,
    pub accepted: bool,
}

#[derive(Default)]
struct Script {
    unreachable: bool,
    known: HashMap<CredentialUid, CredentialRecord>,
    refuse_attendance: bool,
    refused_sequences: HashSet<u64>,
    registrations: Vec<DeviceId>,
    verify_calls: Vec<CredentialUid>,
    reports: Vec<ReceivedReport>,
}

/// In-process [`Authority`] with a fixed credential table.
///
/// Records every call so tests can assert on network traffic.
#[derive(Default)]
pub struct ScriptedAuthority {
    script: Mutex<Script>,
}

impl ScriptedAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the server vouch for `record.uid`.
    pub fn with_credential(self, record: CredentialRecord) -> Self {
        self.script.lock().known.insert(record.uid.clone(), record);
        self
    }

    /// Fail every call as if the host could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.script.lock().unreachable = unreachable;
    }

    /// Answer every `log-attendance` with a non-200 status.
    pub fn set_refuse_attendance(&self, refuse: bool) {
        self.script.lock().refuse_attendance = refuse;
    }

    /// Answer `log-attendance` for one event with a non-200 status.
    pub fn refuse_sequence(&self, sequence: UptimeMillis) {
        self.script.lock().refused_sequences.insert(sequence.as_millis());
    }

    pub fn verify_calls(&self) -> Vec<CredentialUid> {
        self.script.lock().verify_calls.clone()
    }

    pub fn registrations(&self) -> Vec<DeviceId> {
        self.script.lock().registrations.clone()
    }

    pub fn reports(&self) -> Vec<ReceivedReport> {
        self.script.lock().reports.clone()
    }

    /// Number of attendance reports answered with 200.
    pub fn accepted_reports(&self) -> usize {
        self.script.lock().reports.iter().filter(|r| r.accepted).count()
    }
}

fn refused(endpoint: &'static str) -> AuthorityError {
    AuthorityError::Status {
        endpoint,
        status: 500,
        body: "scripted refusal".to_string(),
    }
}

#[async_trait]
impl Authority for ScriptedAuthority {
    async fn register_device(
        &self,
        profile: &DeviceProfile,
        _timeout: Duration,
    ) -> AuthorityResult<()> {
        let mut script = self.script.lock();
        if script.unreachable {
            return Err(AuthorityError::Unreachable);
        }
        script.registrations.push(profile.device_id.clone());
        Ok(())
    }

    async fn verify_credential(
        &self,
        uid: &CredentialUid,
        _timeout: Duration,
    ) -> AuthorityResult<CredentialRecord> {
        let mut script = self.script.lock();
        if script.unreachable {
            return Err(AuthorityError::Unreachable);
        }
        script.verify_calls.push(uid.clone());
        script
            .known
            .get(uid)
            .cloned()
            .ok_or_else(|| AuthorityError::Rejected(uid.clone()))
    }

    async fn log_attendance(
        &self,
        report: &AttendanceReport<'_>,
        _timeout: Duration,
    ) -> AuthorityResult<()> {
        let mut script = self.script.lock();
        if script.unreachable {
            return Err(AuthorityError::Unreachable);
        }
        let sequence = report.event.sequence;
        let accepted = !script.refuse_attendance
            && !script.refused_sequences.contains(&sequence.as_millis());
        script.reports.push(ReceivedReport {
            sequence,
            uid: report.event.uid.clone(),
            kind: report.kind,
            accepted,
        });
        if accepted {
            Ok(())
        } else {
            Err(refused("log-attendance"))
        }
    }
}
