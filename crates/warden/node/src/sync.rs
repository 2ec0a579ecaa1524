//! Attendance sync queue
//!
//! Wraps the ledger with delivery to the authority. Every event gets one
//! delivery attempt right after it is recorded (when the link is up) and
//! is then picked up again by every flush, as selected by the
//! [`DeliveryMode`].

use crate::config::{DeliveryMode, NodeConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use warden_authority::{AttendanceReport, Authority, DeliveryKind};
use warden_store::{AttendanceLedger, StoreResult};
use warden_types::AttendanceEvent;

/// Result of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Events the server acknowledged
    pub sent: usize,
    /// Events attempted
    pub total: usize,
}

impl FlushReport {
    pub fn failed(&self) -> usize {
        self.total - self.sent
    }
}

pub struct SyncQueue {
    ledger: AttendanceLedger,
    authority: Arc<dyn Authority>,
    mode: DeliveryMode,
    location: String,
    delivery_timeout: Duration,
    sync_timeout: Duration,
    spacing: Duration,
}

impl SyncQueue {
    pub fn new(
        ledger: AttendanceLedger,
        authority: Arc<dyn Authority>,
        config: &NodeConfig,
    ) -> Self {
        Self {
            ledger,
            authority,
            mode: config.sync.mode,
            location: config.device.location.clone(),
            delivery_timeout: config.authority.delivery_timeout(),
            sync_timeout: config.authority.sync_timeout(),
            spacing: config.sync.spacing(),
        }
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Durably append an event to the ledger and return its position.
    pub async fn record(&mut self, event: AttendanceEvent) -> StoreResult<usize> {
        self.ledger.record(event).await
    }

    /// Send a freshly granted event. Returns whether the server
    /// acknowledged it.
    ///
    /// `position` is the event's ledger position, `None` when it could not
    /// be recorded; the acknowledgment then has nothing to mark.
    #[instrument(skip(self, event), fields(sequence = %event.sequence))]
    pub async fn deliver_now(&mut self, position: Option<usize>, event: &AttendanceEvent) -> bool {
        let delivered = self
            .deliver(position, event, DeliveryKind::Immediate, self.delivery_timeout)
            .await;
        if delivered {
            info!("Attendance delivered");
        }
        delivered
    }

    /// Attempt delivery of every event the mode selects.
    ///
    /// Each event is sent independently with its own timeout; a failure
    /// does not stop the flush or undo earlier acknowledgments.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn flush(&mut self) -> FlushReport {
        let batch: Vec<(usize, AttendanceEvent)> = match self.mode {
            DeliveryMode::ResendAll => self.ledger.events().iter().cloned().enumerate().collect(),
            DeliveryMode::PendingOnly => self.ledger.pending(),
        };

        let total = batch.len();
        if total == 0 {
            debug!("Nothing to sync");
            return FlushReport::default();
        }

        info!(total, "Syncing attendance records");
        let mut sent = 0;
        for (index, (position, event)) in batch.iter().enumerate() {
            if index > 0 {
                sleep(self.spacing).await;
            }
            if self
                .deliver(Some(*position), event, DeliveryKind::Sync, self.sync_timeout)
                .await
            {
                sent += 1;
            }
        }

        let report = FlushReport { sent, total };
        if report.failed() > 0 {
            warn!(sent, total, "Attendance sync incomplete");
        } else {
            info!(sent, total, "Attendance sync complete");
        }
        report
    }

    async fn deliver(
        &mut self,
        position: Option<usize>,
        event: &AttendanceEvent,
        kind: DeliveryKind,
        timeout: Duration,
    ) -> bool {
        let report = AttendanceReport {
            event,
            location: &self.location,
            kind,
        };

        if let Err(e) = self.authority.log_attendance(&report, timeout).await {
            warn!(sequence = %event.sequence, error = %e, "Attendance delivery failed");
            return false;
        }

        if let Some(position) = position {
            if let Err(e) = self.ledger.mark_delivered(position).await {
                warn!(position, error = %e, "Could not persist acknowledgment");
            }
        }
        true
    }
}
