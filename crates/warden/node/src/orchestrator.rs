//! Decision orchestrator
//!
//! Turns one presented credential into an [`Outcome`]:
//! 1. resolve the identity from the cache, or from the authority when the
//!    link is up, caching what the authority returns
//! 2. run the biometric pipeline
//! 3. on a grant, release the lock, record attendance and try to deliver it
//!
//! The orchestrator also owns the reaction to link changes: every
//! reconnection flushes the attendance ledger.

use crate::clock::Uptime;
use crate::config::{BiometricConfig, NodeConfig};
use crate::devices::{BiometricSensor, CredentialReader, Output};
use crate::feedback::Feedback;
use crate::panel::Panel;
use crate::sync::{FlushReport, SyncQueue};
use crate::verify::VerificationPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use warden_authority::Authority;
use warden_store::AuthorizationCache;
use warden_types::{
    AttendanceEvent, CredentialRecord, CredentialUid, DenyReason, DeviceId, LinkState,
    LinkStateChange, Outcome,
};

const DETECT_BEEP: Duration = Duration::from_millis(100);
const DETECT_HOLD: Duration = Duration::from_secs(1);
const CARD_VALID_BLINK: Duration = Duration::from_millis(500);
const COMPLETE_HOLD: Duration = Duration::from_secs(2);
const DENY_HOLD: Duration = Duration::from_secs(2);

/// Operator-facing peripherals used during a scan cycle
pub struct Station {
    pub reader: Box<dyn CredentialReader>,
    pub sensor: Box<dyn BiometricSensor>,
    pub panel: Panel,
    pub feedback: Feedback,
}

pub struct Orchestrator {
    cache: AuthorizationCache,
    sync: SyncQueue,
    authority: Arc<dyn Authority>,
    biometric: BiometricConfig,
    device_id: DeviceId,
    verify_timeout: Duration,
    unlock_window: Duration,
    uptime: Uptime,
}

impl Orchestrator {
    pub fn new(
        config: &NodeConfig,
        cache: AuthorizationCache,
        sync: SyncQueue,
        authority: Arc<dyn Authority>,
        uptime: Uptime,
    ) -> Self {
        Self {
            cache,
            sync,
            authority,
            biometric: config.biometric.clone(),
            device_id: config.device.device_id(),
            verify_timeout: config.authority.verify_timeout(),
            unlock_window: config.timing.unlock_window(),
            uptime,
        }
    }

    pub fn cache(&self) -> &AuthorizationCache {
        &self.cache
    }

    pub fn sync(&self) -> &SyncQueue {
        &self.sync
    }

    /// Run one full scan cycle for `uid`.
    ///
    /// `link` is the link state at the time the card was read. It decides
    /// whether the authority is consulted and whether the new attendance
    /// event is sent right away.
    #[instrument(skip_all, fields(uid = %uid, link = %link))]
    pub async fn handle_scan(
        &mut self,
        uid: &CredentialUid,
        link: LinkState,
        station: &mut Station,
    ) -> Outcome {
        station.panel.show("Card Detected", &uid.display_form());
        station.feedback.beep(DETECT_BEEP).await;
        sleep(DETECT_HOLD).await;

        let Some(identity) = self.resolve(uid, link).await else {
            return self.deny(DenyReason::UnknownCredential, station).await;
        };

        station.panel.show("Card Valid", "Scan Fingerprint");
        station.feedback.pulse(Output::GreenLed, CARD_VALID_BLINK).await;

        let attempt = VerificationPipeline::new(&self.biometric, uid.clone())
            .run(
                station.sensor.as_mut(),
                &mut station.panel,
                &mut station.feedback,
            )
            .await;
        if !attempt.is_verified() {
            return self.deny(DenyReason::BiometricMismatch, station).await;
        }

        self.grant(identity, link, station).await
    }

    /// Flush the ledger when the link came back.
    pub async fn on_link_change(&mut self, change: LinkStateChange) -> Option<FlushReport> {
        match change {
            LinkStateChange::Reconnected => Some(self.sync.flush().await),
            LinkStateChange::Disconnected => None,
        }
    }

    /// Scheduled flush, only called while the link is up.
    pub async fn periodic_sync(&mut self) -> FlushReport {
        self.sync.flush().await
    }

    async fn resolve(&mut self, uid: &CredentialUid, link: LinkState) -> Option<CredentialRecord> {
        if let Some(record) = self.cache.lookup(uid) {
            info!(name = %record.display_name, "Credential found in local cache");
            return Some(record.clone());
        }

        if !link.is_up() {
            info!("Unknown credential while offline");
            return None;
        }

        match self.authority.verify_credential(uid, self.verify_timeout).await {
            Ok(record) => {
                info!(name = %record.display_name, "Credential verified by authority");
                if let Err(e) = self.cache.insert(record.clone()).await {
                    warn!(error = %e, "Could not cache verified credential");
                }
                Some(record)
            }
            Err(e) => {
                warn!(error = %e, "Remote verification failed");
                None
            }
        }
    }

    async fn grant(
        &mut self,
        identity: CredentialRecord,
        link: LinkState,
        station: &mut Station,
    ) -> Outcome {
        info!(name = %identity.display_name, "Access granted");
        station.panel.show("Access Granted", "Welcome!");
        station.feedback.set(Output::GreenLed, true);
        station.feedback.grant_chime().await;

        station.panel.show("Door Unlocked", "Enter now");
        station.feedback.unlock(self.unlock_window).await;
        station.feedback.set(Output::GreenLed, false);

        let event = AttendanceEvent::entry(self.uptime.now(), &identity, self.device_id.clone());
        let position = match self.sync.record(event.clone()).await {
            Ok(position) => Some(position),
            Err(e) => {
                warn!(error = %e, "Attendance could not be recorded locally");
                None
            }
        };
        if link.is_up() {
            self.sync.deliver_now(position, &event).await;
        } else {
            info!("Offline, attendance will be synced when the link returns");
        }

        station.panel.show("Access Complete", "Door locked");
        sleep(COMPLETE_HOLD).await;
        station.panel.ready();

        Outcome::Granted(identity)
    }

    async fn deny(&mut self, reason: DenyReason, station: &mut Station) -> Outcome {
        warn!(%reason, "Access denied");
        station.panel.show("Access Denied", reason.panel_text());
        station.feedback.deny_alarm().await;
        sleep(DENY_HOLD).await;
        station.panel.ready();
        debug!("Scan cycle complete");

        Outcome::Denied(reason)
    }
}
