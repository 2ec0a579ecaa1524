//! Authorization cache - local credential to identity mapping
//!
//! The cache is the node's source of truth while offline. It is an
//! append-only log: records are never updated or removed, and when a uid
//! appears more than once the first stored record wins.

use crate::codec::{decode_lines, LineCodec};
use crate::error::StoreResult;
use crate::log::LineLog;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use warden_types::{CredentialRecord, CredentialUid};

/// Append-only credential cache
pub struct AuthorizationCache {
    log: Arc<dyn LineLog>,
    records: Vec<CredentialRecord>,
    /// uid -> position of its first record
    first_by_uid: HashMap<CredentialUid, usize>,
}

impl AuthorizationCache {
    /// Create an empty cache over `log` without reading it.
    pub fn new(log: Arc<dyn LineLog>) -> Self {
        Self {
            log,
            records: Vec::new(),
            first_by_uid: HashMap::new(),
        }
    }

    /// Rebuild the cache from everything previously persisted to `log`.
    pub async fn load(log: Arc<dyn LineLog>) -> StoreResult<Self> {
        let location = log.location();
        let lines = log.read_lines().await?;
        let mut cache = Self::new(log);
        for record in decode_lines::<CredentialRecord>(&location, &lines) {
            cache.push(record);
        }
        info!(
            location = %location,
            records = cache.records.len(),
            "Authorization cache loaded"
        );
        Ok(cache)
    }

    /// Look up a uid. Local only; never blocks on the network.
    pub fn lookup(&self, uid: &CredentialUid) -> Option<&CredentialRecord> {
        self.first_by_uid.get(uid).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, uid: &CredentialUid) -> bool {
        self.first_by_uid.contains_key(uid)
    }

    /// Persist a record, then make it visible to lookups.
    ///
    /// A record for an already-cached uid is stored but never returned by
    /// [`lookup`](Self::lookup).
    pub async fn insert(&mut self, record: CredentialRecord) -> StoreResult<()> {
        self.log.append(&record.encode()).await?;
        debug!(uid = %record.uid, name = %record.display_name, "Credential cached");
        self.push(record);
        Ok(())
    }

    /// Every stored record in insertion order, duplicates included.
    pub fn persisted_snapshot(&self) -> Vec<CredentialRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push(&mut self, record: CredentialRecord) {
        let idx = self.records.len();
        self.first_by_uid.entry(record.uid.clone()).or_insert(idx);
        self.records.push(record);
    }
}
