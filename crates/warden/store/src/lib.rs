//! Warden Store - Append-only local state for the access-control node
//!
//! Two logs survive power loss on the node:
//! - the authorization cache (`uid,displayName,subjectId,role`)
//! - the attendance ledger (`timestamp,uid,displayName,action,deviceId`)
//!
//! Both sit on a [`LineLog`] backend, file-based in production and
//! in-memory for tests.

#![deny(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod error;
pub mod ledger;
pub mod log;

pub use cache::AuthorizationCache;
pub use codec::LineCodec;
pub use error::{StoreError, StoreResult};
pub use ledger::AttendanceLedger;
pub use log::{FileLineLog, LineLog, MemoryLineLog};
