//! Warden Authority - Client for the remote authority server
//!
//! The authority server owns the credential registry and the central
//! attendance record. The node talks to it over three JSON/HTTP POST
//! endpoints:
//! - `device/register` once at boot
//! - `verify-rfid` for credentials missing from the local cache
//! - `log-attendance` for every granted access, immediately and on sync
//!
//! Only a 200 answer counts as success. Anything else, including a
//! malformed body, is reported as an [`AuthorityError`].

#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod mock;
pub mod wire;

pub use client::{Authority, HttpAuthority};
pub use error::{AuthorityError, AuthorityResult};
pub use mock::{ReceivedReport, ScriptedAuthority};
pub use wire::{AttendanceReport, DeliveryKind, DeviceProfile};
