//! Warden Types - Core types for the access-control node
//!
//! Shared by the stores, the authority client and the node runtime:
//! - Identifiers (credential uids, device and subject ids, uptime stamps)
//! - Cached credential records and attendance events
//! - Link state and its transitions
//! - Scan outcomes

#![deny(unsafe_code)]

pub mod error;
pub mod ids;
pub mod link;
pub mod outcome;
pub mod records;

pub use error::{TypesError, TypesResult};
pub use ids::{CredentialUid, DeviceId, SubjectId, UptimeMillis};
pub use link::{LinkState, LinkStateChange};
pub use outcome::{DenyReason, Outcome};
pub use records::{AttendanceAction, AttendanceEvent, CredentialRecord};
