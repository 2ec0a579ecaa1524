#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use warden_authority::ScriptedAuthority;
use warden_node::devices::sim::{self, SimHandles};
use warden_node::{DeliveryMode, Node, NodeConfig, Stores};
use warden_store::{AttendanceLedger, AuthorizationCache, LineCodec, LineLog, MemoryLineLog};
use warden_types::{CredentialRecord, CredentialUid, SubjectId};

pub const ALICE_UID: &str = "04A1B2C3";
pub const BOB_UID: &str = "DEADBEEF";

pub struct Harness {
    pub node: Node,
    pub handles: SimHandles,
    pub authority: Arc<ScriptedAuthority>,
}

impl Harness {
    /// Present a card and run one reader tick.
    pub async fn scan(&mut self, uid: &str) -> Option<warden_types::Outcome> {
        self.handles.reader.present_uid(&uid_of(uid));
        self.node.poll_reader().await
    }

    /// Let the scan guard expire.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
}

pub fn uid_of(uid: &str) -> CredentialUid {
    CredentialUid::parse(uid).unwrap()
}

pub fn alice() -> CredentialRecord {
    CredentialRecord::new(uid_of(ALICE_UID), "Alice", SubjectId::new("U1"), "student")
}

pub fn bob() -> CredentialRecord {
    CredentialRecord::new(uid_of(BOB_UID), "Bob", SubjectId::new("42"), "staff")
}

pub fn config(link_up: bool) -> NodeConfig {
    let mut config = NodeConfig::in_memory();
    config.simulation.link_up = link_up;
    config
}

/// Memory stores whose cache already knows `cached`.
pub async fn stores_with(config: &NodeConfig, cached: &[CredentialRecord]) -> Stores {
    let lines: Vec<String> = cached.iter().map(LineCodec::encode).collect();
    let acks: Option<Arc<dyn LineLog>> = match config.sync.mode {
        DeliveryMode::ResendAll => None,
        DeliveryMode::PendingOnly => Some(Arc::new(MemoryLineLog::new("acks"))),
    };

    Stores {
        cache: AuthorizationCache::load(Arc::new(MemoryLineLog::with_lines("cards", lines)))
            .await
            .unwrap(),
        ledger: AttendanceLedger::new(Arc::new(MemoryLineLog::new("attendance")), acks),
    }
}

pub async fn boot(
    config: NodeConfig,
    authority: ScriptedAuthority,
    stores: Option<Stores>,
) -> Harness {
    let authority = Arc::new(authority);
    let (devices, handles) = sim::devices(&config.simulation);
    let node = Node::boot_with(config, devices, authority.clone(), stores).await;
    Harness {
        node,
        handles,
        authority,
    }
}
