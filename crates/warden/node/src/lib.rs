//! Warden Node - Offline-first access-control node
//!
//! A node guards one door. For every presented card it:
//! - resolves the holder from its local authorization cache, asking the
//!   authority server only for unknown cards and only while online
//! - requires a fingerprint match within a bounded number of attempts
//! - releases the lock, records attendance locally and delivers it to the
//!   server now or on a later sync
//!
//! Everything runs in one cooperative control loop ([`Node::run`]).

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod devices;
pub mod error;
pub mod feedback;
pub mod input;
pub mod link;
pub mod node;
pub mod orchestrator;
pub mod panel;
pub mod sync;
pub mod verify;

pub use config::{DeliveryMode, NodeConfig, StorageConfig};
pub use devices::Devices;
pub use error::{NodeError, NodeResult};
pub use link::ConnectivityMonitor;
pub use node::{BootReport, LinkEvent, Node, Stores};
pub use orchestrator::{Orchestrator, Station};
pub use sync::{FlushReport, SyncQueue};
pub use verify::{VerificationAttempt, VerificationPipeline, VerificationState};
