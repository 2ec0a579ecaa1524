//! Device collaborators
//!
//! The node core never touches hardware directly. Each peripheral sits
//! behind a narrow trait:
//! - [`CredentialReader`]: card reader, polled for newly presented cards
//! - [`BiometricSensor`]: fingerprint sensor, polled for a match
//! - [`TextDisplay`]: two-line character display
//! - [`Indicators`]: lock relay, LEDs and buzzer
//! - [`LinkProbe`]: network interface status
//! - [`StatusButton`]: operator push button
//!
//! [`sim`] provides scriptable implementations used by `wardend` and tests.

pub mod sim;

use crate::error::{BiometricError, DeviceResult};
use async_trait::async_trait;

/// A biometric match reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiometricMatch {
    /// Enrolled template that matched
    pub template_id: u16,
    /// Sensor confidence score, logged only
    pub confidence: u16,
}

/// Card reader
#[async_trait]
pub trait CredentialReader: Send {
    /// Self-test. Returns the reader firmware version.
    async fn self_test(&mut self) -> DeviceResult<u8>;

    /// Serial bytes of a newly presented card, if any.
    async fn poll_card(&mut self) -> Option<Vec<u8>>;

    /// Put the current card to sleep until it is removed and presented again.
    async fn halt(&mut self);
}

/// Fingerprint sensor
#[async_trait]
pub trait BiometricSensor: Send {
    /// Password handshake with the sensor.
    async fn self_test(&mut self) -> DeviceResult<()>;

    /// One capture and search.
    ///
    /// `Ok(None)` means no finger or no matching template. The sensor's own
    /// decision is final; confidence is not compared against a threshold.
    async fn scan(&mut self) -> Result<Option<BiometricMatch>, BiometricError>;
}

/// Two-line character display
pub trait TextDisplay: Send {
    fn show(&mut self, top: &str, bottom: &str);
}

/// Discrete outputs driven by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Lock,
    GreenLed,
    RedLed,
    Buzzer,
}

impl Output {
    pub const ALL: [Output; 4] = [Output::Lock, Output::GreenLed, Output::RedLed, Output::Buzzer];
}

/// Lock relay, LEDs and buzzer
pub trait Indicators: Send {
    fn set(&mut self, output: Output, on: bool);
}

/// Network interface
#[async_trait]
pub trait LinkProbe: Send {
    /// Start associating with the network. Returns immediately.
    async fn connect(&mut self);

    /// Live association status. Cheap and non-blocking.
    fn is_connected(&self) -> bool;

    fn local_address(&self) -> Option<String>;
}

/// Operator push button, raw level
pub trait StatusButton: Send {
    fn is_pressed(&self) -> bool;
}

/// Every peripheral the node needs, handed over at boot
pub struct Devices {
    pub reader: Box<dyn CredentialReader>,
    pub sensor: Box<dyn BiometricSensor>,
    pub display: Box<dyn TextDisplay>,
    pub indicators: Box<dyn Indicators>,
    pub link: Box<dyn LinkProbe>,
    pub button: Box<dyn StatusButton>,
}
