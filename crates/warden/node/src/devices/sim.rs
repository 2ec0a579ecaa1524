//! Simulated peripherals
//!
//! Each simulated device comes with a cloneable handle that scripts its
//! inputs and inspects its outputs from outside the control loop.

use super::{
    BiometricMatch, BiometricSensor, CredentialReader, Devices, Indicators, LinkProbe, Output,
    StatusButton, TextDisplay,
};
use crate::config::SimulationConfig;
use crate::error::{BiometricError, DeviceError, DeviceResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use warden_types::CredentialUid;

const SIM_READER_VERSION: u8 = 0x92;
const SIM_CONFIDENCE: u16 = 120;
/// Screens a display handle can look back on; older ones are dropped.
const SCREEN_HISTORY: usize = 256;

// ---------------------------------------------------------------------------
// Reader

#[derive(Default)]
struct ReaderState {
    queue: VecDeque<Vec<u8>>,
    halts: usize,
    missing: bool,
}

/// Card reader fed from a queue of presented cards
pub struct SimReader {
    state: Arc<Mutex<ReaderState>>,
}

#[derive(Clone)]
pub struct ReaderHandle {
    state: Arc<Mutex<ReaderState>>,
}

impl ReaderHandle {
    /// Present a card with the given serial bytes.
    pub fn present(&self, serial: impl Into<Vec<u8>>) {
        self.state.lock().queue.push_back(serial.into());
    }

    pub fn present_uid(&self, uid: &CredentialUid) {
        if let Ok(serial) = hex::decode(uid.as_str()) {
            self.present(serial);
        }
    }

    /// Cards presented but not yet read.
    pub fn waiting(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn halts(&self) -> usize {
        self.state.lock().halts
    }

    /// Make the self-test fail as if the reader were unwired.
    pub fn set_missing(&self, missing: bool) {
        self.state.lock().missing = missing;
    }
}

#[async_trait]
impl CredentialReader for SimReader {
    async fn self_test(&mut self) -> DeviceResult<u8> {
        if self.state.lock().missing {
            return Err(DeviceError::NotDetected("card reader"));
        }
        Ok(SIM_READER_VERSION)
    }

    async fn poll_card(&mut self) -> Option<Vec<u8>> {
        self.state.lock().queue.pop_front()
    }

    async fn halt(&mut self) {
        self.state.lock().halts += 1;
    }
}

// ---------------------------------------------------------------------------
// Biometric sensor

/// Scripted answer to one sensor scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReply {
    Match(u16),
    NoMatch,
    Error(BiometricError),
}

struct SensorState {
    script: VecDeque<SensorReply>,
    fallback: SensorReply,
    scans: usize,
    faulty: bool,
}

/// Fingerprint sensor answering from a script, then from a fallback reply
pub struct SimSensor {
    state: Arc<Mutex<SensorState>>,
}

#[derive(Clone)]
pub struct SensorHandle {
    state: Arc<Mutex<SensorState>>,
}

impl SensorHandle {
    /// Queue one reply ahead of the fallback.
    pub fn push(&self, reply: SensorReply) {
        self.state.lock().script.push_back(reply);
    }

    /// Reply used once the script is exhausted.
    pub fn set_fallback(&self, reply: SensorReply) {
        self.state.lock().fallback = reply;
    }

    /// Number of scans performed so far.
    pub fn scans(&self) -> usize {
        self.state.lock().scans
    }

    pub fn set_faulty(&self, faulty: bool) {
        self.state.lock().faulty = faulty;
    }
}

#[async_trait]
impl BiometricSensor for SimSensor {
    async fn self_test(&mut self) -> DeviceResult<()> {
        if self.state.lock().faulty {
            return Err(DeviceError::Handshake {
                device: "fingerprint sensor",
                reason: "wrong password".to_string(),
            });
        }
        Ok(())
    }

    async fn scan(&mut self) -> Result<Option<BiometricMatch>, BiometricError> {
        let mut state = self.state.lock();
        state.scans += 1;
        let reply = state.script.pop_front().unwrap_or(state.fallback);
        match reply {
            SensorReply::Match(template_id) => Ok(Some(BiometricMatch {
                template_id,
                confidence: SIM_CONFIDENCE,
            })),
            SensorReply::NoMatch => Ok(None),
            SensorReply::Error(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Display

/// Display that logs every screen and keeps the most recent ones
pub struct SimDisplay {
    screens: Arc<Mutex<VecDeque<(String, String)>>>,
}

#[derive(Clone)]
pub struct DisplayHandle {
    screens: Arc<Mutex<VecDeque<(String, String)>>>,
}

impl DisplayHandle {
    /// Recent screens, oldest first.
    pub fn screens(&self) -> Vec<(String, String)> {
        self.screens.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<(String, String)> {
        self.screens.lock().back().cloned()
    }

    /// Whether any screen had `top` as its first line.
    pub fn showed(&self, top: &str) -> bool {
        self.screens.lock().iter().any(|(t, _)| t == top)
    }
}

impl TextDisplay for SimDisplay {
    fn show(&mut self, top: &str, bottom: &str) {
        info!(target: "warden::display", "[{:<16}] [{:<16}]", top, bottom);
        let mut screens = self.screens.lock();
        if screens.len() == SCREEN_HISTORY {
            screens.pop_front();
        }
        screens.push_back((top.to_string(), bottom.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Indicators

#[derive(Default)]
struct IndicatorState {
    levels: HashMap<Output, bool>,
    activations: HashMap<Output, usize>,
}

/// Outputs that track their level and count rising edges
pub struct SimIndicators {
    state: Arc<Mutex<IndicatorState>>,
}

#[derive(Clone)]
pub struct IndicatorHandle {
    state: Arc<Mutex<IndicatorState>>,
}

impl IndicatorHandle {
    pub fn is_on(&self, output: Output) -> bool {
        self.state.lock().levels.get(&output).copied().unwrap_or(false)
    }

    /// Number of times `output` went from off to on.
    pub fn activations(&self, output: Output) -> usize {
        self.state.lock().activations.get(&output).copied().unwrap_or(0)
    }
}

impl Indicators for SimIndicators {
    fn set(&mut self, output: Output, on: bool) {
        let mut state = self.state.lock();
        let was_on = state.levels.insert(output, on).unwrap_or(false);
        if on && !was_on {
            *state.activations.entry(output).or_default() += 1;
        }
        debug!(target: "warden::indicators", ?output, on, "Output set");
    }
}

// ---------------------------------------------------------------------------
// Link

struct NetState {
    connected: bool,
    address: String,
    connects: usize,
}

/// Network interface whose status is flipped from the handle
pub struct SimLink {
    state: Arc<Mutex<NetState>>,
}

#[derive(Clone)]
pub struct LinkHandle {
    state: Arc<Mutex<NetState>>,
}

impl LinkHandle {
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }
}

#[async_trait]
impl LinkProbe for SimLink {
    async fn connect(&mut self) {
        self.state.lock().connects += 1;
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn local_address(&self) -> Option<String> {
        let state = self.state.lock();
        state.connected.then(|| state.address.clone())
    }
}

// ---------------------------------------------------------------------------
// Button

pub struct SimButton {
    pressed: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct ButtonHandle {
    pressed: Arc<AtomicBool>,
}

impl ButtonHandle {
    pub fn set_pressed(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::SeqCst);
    }
}

impl StatusButton for SimButton {
    fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------

/// Handles to a full set of simulated devices
#[derive(Clone)]
pub struct SimHandles {
    pub reader: ReaderHandle,
    pub sensor: SensorHandle,
    pub display: DisplayHandle,
    pub indicators: IndicatorHandle,
    pub link: LinkHandle,
    pub button: ButtonHandle,
}

/// Build a simulated device set.
///
/// The sensor matches `config.template_id` on every scan until scripted
/// otherwise; the link starts in `config.link_up`.
pub fn devices(config: &SimulationConfig) -> (Devices, SimHandles) {
    let reader = Arc::new(Mutex::new(ReaderState::default()));
    let sensor = Arc::new(Mutex::new(SensorState {
        script: VecDeque::new(),
        fallback: SensorReply::Match(config.template_id),
        scans: 0,
        faulty: false,
    }));
    let screens = Arc::new(Mutex::new(VecDeque::with_capacity(SCREEN_HISTORY)));
    let indicators = Arc::new(Mutex::new(IndicatorState::default()));
    let link = Arc::new(Mutex::new(NetState {
        connected: config.link_up,
        address: config.local_address.clone(),
        connects: 0,
    }));
    let pressed = Arc::new(AtomicBool::new(false));

    let devices = Devices {
        reader: Box::new(SimReader {
            state: reader.clone(),
        }),
        sensor: Box::new(SimSensor {
            state: sensor.clone(),
        }),
        display: Box::new(SimDisplay {
            screens: screens.clone(),
        }),
        indicators: Box::new(SimIndicators {
            state: indicators.clone(),
        }),
        link: Box::new(SimLink { state: link.clone() }),
        button: Box::new(SimButton {
            pressed: pressed.clone(),
        }),
    };

    let handles = SimHandles {
        reader: ReaderHandle { state: reader },
        sensor: SensorHandle { state: sensor },
        display: DisplayHandle { screens },
        indicators: IndicatorHandle { state: indicators },
        link: LinkHandle { state: link },
        button: ButtonHandle { pressed },
    };

    (devices, handles)
}
