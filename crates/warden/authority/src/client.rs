//! HTTP client for the authority server

use crate::error::{AuthorityError, AuthorityResult};
use crate::wire::{
    AttendanceReport, AttendanceRequest, DeviceProfile, RegisterRequest, VerifyRequest,
    VerifyResponse,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use warden_types::{CredentialRecord, CredentialUid};

const REGISTER_PATH: &str = "device/register";
const VERIFY_PATH: &str = "verify-rfid";
const ATTENDANCE_PATH: &str = "log-attendance";

/// Remote authority the node defers to for unknown credentials and reports
/// attendance to.
///
/// Every call carries its own timeout and runs to completion or timeout;
/// callers cannot cancel it.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Announce this node. The response body is informational only.
    async fn register_device(
        &self,
        profile: &DeviceProfile,
        timeout: Duration,
    ) -> AuthorityResult<()>;

    /// Ask the server who owns `uid`.
    async fn verify_credential(
        &self,
        uid: &CredentialUid,
        timeout: Duration,
    ) -> AuthorityResult<CredentialRecord>;

    /// Deliver one attendance event. `Ok` means the server answered 200.
    async fn log_attendance(
        &self,
        report: &AttendanceReport<'_>,
        timeout: Duration,
    ) -> AuthorityResult<()>;
}

/// [`Authority`] over JSON/HTTP POST
pub struct HttpAuthority {
    client: Client,
    base_url: String,
}

impl HttpAuthority {
    /// Create a client for the server rooted at `base_url`
    /// (e.g. `http://10.0.0.5:5000/api/esp32`).
    pub fn new(base_url: &str) -> AuthorityResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AuthorityError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` and return the response text of a 200 answer.
    async fn post<B: Serialize + Sync>(
        &self,
        path: &'static str,
        body: &B,
        timeout: Duration,
    ) -> AuthorityResult<String> {
        let url = format!("{}/{}", self.base_url, path);
        let timeout_ms = timeout.as_millis() as u64;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                AuthorityError::Timeout {
                    endpoint: path,
                    timeout_ms,
                }
            } else {
                AuthorityError::Transport {
                    endpoint: path,
                    source: e,
                }
            }
        };

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        let text = response.text().await.map_err(map_err)?;

        if status == StatusCode::OK {
            Ok(text)
        } else {
            Err(AuthorityError::Status {
                endpoint: path,
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    #[instrument(skip(self, profile), fields(device_id = %profile.device_id))]
    async fn register_device(
        &self,
        profile: &DeviceProfile,
        timeout: Duration,
    ) -> AuthorityResult<()> {
        let body = self
            .post(REGISTER_PATH, &RegisterRequest::from(profile), timeout)
            .await?;
        debug!(response = %body, "Device registered");
        Ok(())
    }

    #[instrument(skip(self, uid), fields(uid = %uid))]
    async fn verify_credential(
        &self,
        uid: &CredentialUid,
        timeout: Duration,
    ) -> AuthorityResult<CredentialRecord> {
        let body = self
            .post(
                VERIFY_PATH,
                &VerifyRequest {
                    rfid_uid: uid.as_str(),
                },
                timeout,
            )
            .await?;

        let parsed: VerifyResponse =
            serde_json::from_str(&body).map_err(|e| AuthorityError::Malformed {
                endpoint: VERIFY_PATH,
                reason: e.to_string(),
            })?;

        match parsed.into_record(uid) {
            Some(record) => Ok(record),
            None => {
                warn!(response = %body, "Server did not vouch for credential");
                Err(AuthorityError::Rejected(uid.clone()))
            }
        }
    }

    #[instrument(skip(self, report), fields(sequence = %report.event.sequence, uid = %report.event.uid))]
    async fn log_attendance(
        &self,
        report: &AttendanceReport<'_>,
        timeout: Duration,
    ) -> AuthorityResult<()> {
        self.post(ATTENDANCE_PATH, &AttendanceRequest::from(report), timeout)
            .await?;
        Ok(())
    }
}
