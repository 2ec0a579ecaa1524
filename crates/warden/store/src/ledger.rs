//! Attendance ledger - durable local log of granted accesses
//!
//! Every granted access is appended here before any delivery attempt. The
//! ledger never removes an event, so an event's position in the log is its
//! stable key. Delivery acknowledgments are only made durable when an
//! acknowledgment log is attached; it holds one position per line. Without
//! one the `delivered` flags last for the lifetime of the process.

use crate::codec::{decode_lines, LineCodec};
use crate::error::StoreResult;
use crate::log::LineLog;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_types::AttendanceEvent;

/// Append-only attendance ledger
pub struct AttendanceLedger {
    log: Arc<dyn LineLog>,
    acks: Option<Arc<dyn LineLog>>,
    events: Vec<AttendanceEvent>,
}

impl AttendanceLedger {
    /// Create an empty ledger without reading the logs.
    pub fn new(log: Arc<dyn LineLog>, acks: Option<Arc<dyn LineLog>>) -> Self {
        Self {
            log,
            acks,
            events: Vec::new(),
        }
    }

    /// Rebuild the ledger from its event log and, if present, its
    /// acknowledgment log.
    pub async fn load(log: Arc<dyn LineLog>, acks: Option<Arc<dyn LineLog>>) -> StoreResult<Self> {
        let location = log.location();
        let lines = log.read_lines().await?;
        let mut events = decode_lines::<AttendanceEvent>(&location, &lines);

        if let Some(acks) = &acks {
            let acked: HashSet<usize> = acks
                .read_lines()
                .await?
                .iter()
                .filter_map(|line| match line.parse::<usize>() {
                    Ok(position) if position < events.len() => Some(position),
                    _ => {
                        warn!(location = %acks.location(), line = %line, "Skipping malformed ack");
                        None
                    }
                })
                .collect();
            for (position, event) in events.iter_mut().enumerate() {
                event.delivered = acked.contains(&position);
            }
        }

        let ledger = Self { log, acks, events };
        info!(
            location = %location,
            events = ledger.len(),
            pending = ledger.pending_count(),
            "Attendance ledger loaded"
        );
        Ok(ledger)
    }

    /// Durably append an event and return its position. It is only kept in
    /// memory once persisted.
    pub async fn record(&mut self, event: AttendanceEvent) -> StoreResult<usize> {
        self.log.append(&event.encode()).await?;
        let position = self.events.len();
        debug!(
            position,
            sequence = %event.sequence,
            uid = %event.uid,
            "Attendance recorded"
        );
        self.events.push(event);
        Ok(position)
    }

    /// Flag the event at `position` as acknowledged by the server.
    ///
    /// Returns `false` when there is no pending event at that position. The
    /// flag is set in memory even if the acknowledgment cannot be persisted.
    pub async fn mark_delivered(&mut self, position: usize) -> StoreResult<bool> {
        let Some(event) = self.events.get_mut(position).filter(|e| e.is_pending()) else {
            return Ok(false);
        };
        event.delivered = true;

        if let Some(acks) = &self.acks {
            acks.append(&position.to_string()).await?;
        }
        Ok(true)
    }

    /// Whether acknowledgments survive a restart.
    pub fn tracks_acknowledgments(&self) -> bool {
        self.acks.is_some()
    }

    /// All events in append order.
    pub fn events(&self) -> &[AttendanceEvent] {
        &self.events
    }

    /// Events not yet acknowledged with their positions, in append order.
    pub fn pending(&self) -> Vec<(usize, AttendanceEvent)> {
        self.events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_pending())
            .map(|(position, e)| (position, e.clone()))
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_pending()).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{FileLineLog, MemoryLineLog};
    use warden_types::{CredentialRecord, CredentialUid, DeviceId, SubjectId, UptimeMillis};

    fn event(at: u64) -> AttendanceEvent {
        event_for(at, "04A1B2C3", "Alice")
    }

    fn event_for(at: u64, uid: &str, name: &str) -> AttendanceEvent {
        let record = CredentialRecord::new(
            CredentialUid::parse(uid).unwrap(),
            name,
            SubjectId::new("U1"),
            "student",
        );
        AttendanceEvent::entry(UptimeMillis(at), &record, DeviceId::new("ESP32_001"))
    }

    #[tokio::test]
    async fn test_record_persists_line() {
        let log = Arc::new(MemoryLineLog::new("attendance"));
        let mut ledger = AttendanceLedger::new(log.clone(), None);

        assert_eq!(ledger.record(event(1000)).await.unwrap(), 0);
        assert_eq!(ledger.record(event(2000)).await.unwrap(), 1);

        assert_eq!(ledger.len(), 2);
        assert_eq!(log.lines()[0], "1000,04A1B2C3,Alice,ENTRY,ESP32_001");
    }

    #[tokio::test]
    async fn test_record_failure_loses_event() {
        let log = Arc::new(MemoryLineLog::new("attendance"));
        let mut ledger = AttendanceLedger::new(log.clone(), None);
        log.set_unavailable(true);

        assert!(ledger.record(event(1000)).await.is_err());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_mark_delivered_without_ack_log_is_volatile() {
        let log = Arc::new(MemoryLineLog::new("attendance"));
        let mut ledger = AttendanceLedger::new(log.clone(), None);
        ledger.record(event(1000)).await.unwrap();
        ledger.record(event(2000)).await.unwrap();

        assert!(ledger.mark_delivered(0).await.unwrap());
        assert!(!ledger.mark_delivered(0).await.unwrap());
        assert!(!ledger.mark_delivered(7).await.unwrap());
        assert_eq!(ledger.pending_count(), 1);

        let reloaded = AttendanceLedger::load(log, None).await.unwrap();
        assert_eq!(reloaded.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_ack_log_restores_delivered_flags() {
        let dir = tempfile::tempdir().unwrap();
        let events_path = dir.path().join("attendance.txt");
        let acks_path = dir.path().join("attendance.acks");

        {
            let log = Arc::new(FileLineLog::open(&events_path).await.unwrap());
            let acks = Arc::new(FileLineLog::open(&acks_path).await.unwrap());
            let mut ledger = AttendanceLedger::new(log, Some(acks));
            ledger.record(event(1000)).await.unwrap();
            let second = ledger.record(event(2000)).await.unwrap();
            ledger.record(event(3000)).await.unwrap();
            ledger.mark_delivered(second).await.unwrap();
        }

        let log = Arc::new(FileLineLog::open(&events_path).await.unwrap());
        let acks = Arc::new(FileLineLog::open(&acks_path).await.unwrap());
        let ledger = AttendanceLedger::load(log, Some(acks)).await.unwrap();

        assert!(ledger.tracks_acknowledgments());
        assert_eq!(ledger.len(), 3);
        let pending: Vec<u64> = ledger
            .pending()
            .iter()
            .map(|(_, e)| e.sequence.as_millis())
            .collect();
        assert_eq!(pending, vec![1000, 3000]);
    }

    #[tokio::test]
    async fn test_repeated_stamp_across_boots_keeps_events_apart() {
        // uptime restarts at every boot, so two boots can produce the same stamp
        let log = Arc::new(MemoryLineLog::with_lines(
            "attendance",
            vec![event_for(5000, "04A1B2C3", "Alice").encode()],
        ));
        let acks = Arc::new(MemoryLineLog::new("acks"));
        let mut ledger = AttendanceLedger::load(log.clone(), Some(acks.clone()))
            .await
            .unwrap();

        let bob = ledger
            .record(event_for(5000, "DEADBEEF", "Bob"))
            .await
            .unwrap();
        assert!(ledger.mark_delivered(bob).await.unwrap());

        let pending: Vec<String> = ledger
            .pending()
            .iter()
            .map(|(_, e)| e.display_name.clone())
            .collect();
        assert_eq!(pending, vec!["Alice"]);

        let reloaded = AttendanceLedger::load(log, Some(acks)).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.pending_count(), 1);
        assert_eq!(reloaded.pending()[0].1.display_name, "Alice");
        assert!(reloaded.events()[1].delivered);
    }

    #[tokio::test]
    async fn test_ack_beyond_the_log_is_ignored() {
        let log = Arc::new(MemoryLineLog::with_lines("attendance", vec![event(1000).encode()]));
        let acks = Arc::new(MemoryLineLog::with_lines(
            "acks",
            vec!["3".to_string(), "junk".to_string()],
        ));

        let ledger = AttendanceLedger::load(log, Some(acks)).await.unwrap();

        assert_eq!(ledger.pending_count(), 1);
    }
}
