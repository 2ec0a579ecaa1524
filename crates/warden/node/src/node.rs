//! Node runtime: boot sequence and control loop
//!
//! The node is a single task. Reader polling, the status button, link
//! checks and periodic syncs are multiplexed with `tokio::select!` and never
//! overlap; a scan cycle or a flush holds the loop until it completes.

use crate::clock::Uptime;
use crate::config::{DeliveryMode, NodeConfig, StorageConfig};
use crate::devices::{Devices, LinkProbe, Output, StatusButton};
use crate::error::NodeResult;
use crate::feedback::Feedback;
use crate::input::{ButtonDebouncer, ScanGuard};
use crate::link::ConnectivityMonitor;
use crate::orchestrator::{Orchestrator, Station};
use crate::panel::Panel;
use crate::sync::{FlushReport, SyncQueue};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use warden_authority::Authority;
use warden_store::{AttendanceLedger, AuthorizationCache, FileLineLog, LineLog, MemoryLineLog};
use warden_types::{CredentialUid, LinkState, LinkStateChange, Outcome};

const STEP_HOLD: Duration = Duration::from_secs(1);
const RESULT_HOLD: Duration = Duration::from_secs(2);
const STATUS_HOLD: Duration = Duration::from_secs(3);
const INIT_BLINK: Duration = Duration::from_millis(200);
const CONNECT_STEP: Duration = Duration::from_secs(1);

/// Cache and ledger the node works from
pub struct Stores {
    pub cache: AuthorizationCache,
    pub ledger: AttendanceLedger,
}

impl Stores {
    /// Open the stores described by the configuration.
    pub async fn open(config: &NodeConfig) -> NodeResult<Self> {
        match &config.storage {
            StorageConfig::Memory => Ok(Self::volatile(config)),
            StorageConfig::File {
                data_dir,
                cache_file,
                ledger_file,
                acks_file,
            } => {
                let cache_log = FileLineLog::open(data_dir.join(cache_file)).await?;
                let ledger_log = FileLineLog::open(data_dir.join(ledger_file)).await?;
                let acks: Option<Arc<dyn LineLog>> = match config.sync.mode {
                    DeliveryMode::ResendAll => None,
                    DeliveryMode::PendingOnly => {
                        Some(Arc::new(FileLineLog::open(data_dir.join(acks_file)).await?))
                    }
                };

                let cache = AuthorizationCache::load(Arc::new(cache_log)).await?;
                let ledger = AttendanceLedger::load(Arc::new(ledger_log), acks).await?;
                Ok(Self { cache, ledger })
            }
        }
    }

    /// Empty in-memory stores. Nothing survives a restart.
    pub fn volatile(config: &NodeConfig) -> Self {
        let acks: Option<Arc<dyn LineLog>> = match config.sync.mode {
            DeliveryMode::ResendAll => None,
            DeliveryMode::PendingOnly => Some(Arc::new(MemoryLineLog::new("attendance.acks"))),
        };
        Self {
            cache: AuthorizationCache::new(Arc::new(MemoryLineLog::new("cards"))),
            ledger: AttendanceLedger::new(Arc::new(MemoryLineLog::new("attendance")), acks),
        }
    }
}

/// What came up at boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootReport {
    pub reader: bool,
    pub sensor: bool,
    pub storage: bool,
    pub link: bool,
    pub registered: bool,
}

impl BootReport {
    pub fn is_degraded(&self) -> bool {
        !(self.reader && self.sensor && self.storage && self.link)
    }
}

/// A link edge seen by the monitor and the flush it triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEvent {
    pub change: LinkStateChange,
    pub flush: Option<FlushReport>,
}

pub struct Node {
    config: NodeConfig,
    station: Station,
    link: Box<dyn LinkProbe>,
    button: Box<dyn StatusButton>,
    monitor: ConnectivityMonitor,
    orchestrator: Orchestrator,
    scan_guard: ScanGuard,
    debouncer: ButtonDebouncer,
    boot_report: BootReport,
}

impl Node {
    /// Boot with the stores named in the configuration.
    pub async fn boot(config: NodeConfig, devices: Devices, authority: Arc<dyn Authority>) -> Self {
        Self::boot_with(config, devices, authority, None).await
    }

    /// Run the boot sequence: self-test every peripheral, open storage,
    /// bring up the link and register with the authority.
    ///
    /// Nothing here is fatal. A failed peripheral is reported on the
    /// panel and the node starts degraded; unusable storage is replaced by
    /// volatile stores.
    pub async fn boot_with(
        config: NodeConfig,
        devices: Devices,
        authority: Arc<dyn Authority>,
        stores: Option<Stores>,
    ) -> Self {
        let uptime = Uptime::start();
        let Devices {
            mut reader,
            mut sensor,
            display,
            indicators,
            mut link,
            button,
        } = devices;
        let mut panel = Panel::new(display);
        let mut feedback = Feedback::new(indicators);
        let mut report = BootReport::default();

        feedback.all_off();
        panel.show("Initializing...", "Please wait");
        feedback.pulse(Output::GreenLed, INIT_BLINK).await;

        match reader.self_test().await {
            Ok(version) => {
                info!(version = %format!("{version:#04x}"), "Card reader ready");
                panel.show("RFID Ready", &format!("Version: {version:#04X}"));
                report.reader = true;
            }
            Err(e) => {
                error!(error = %e, "Card reader self-test failed");
                panel.show("RFID Error", "Check wiring");
            }
        }
        sleep(STEP_HOLD).await;

        panel.show("Checking", "Fingerprint...");
        match sensor.self_test().await {
            Ok(()) => {
                info!("Fingerprint sensor ready");
                panel.show("Fingerprint OK", "Ready");
                report.sensor = true;
            }
            Err(e) => {
                warn!(error = %e, "Fingerprint sensor self-test failed");
                panel.show("Finger Warning", "Check sensor");
            }
        }
        sleep(STEP_HOLD).await;

        panel.show("Initializing", "Storage...");
        let stores = match stores {
            Some(stores) => Ok(stores),
            None => Stores::open(&config).await,
        };
        let stores = match stores {
            Ok(stores) => {
                info!(
                    cached = stores.cache.len(),
                    events = stores.ledger.len(),
                    "Storage ready"
                );
                panel.show("Storage OK", "Ready");
                report.storage = true;
                stores
            }
            Err(e) => {
                error!(error = %e, "Storage unavailable, records will not survive a restart");
                panel.show("Storage Error", "Check memory");
                Stores::volatile(&config)
            }
        };
        sleep(STEP_HOLD).await;

        report.link = connect(link.as_mut(), &mut panel, config.timing.connect_timeout()).await;
        sleep(RESULT_HOLD).await;

        if report.link {
            let profile = config.device.profile();
            match authority
                .register_device(&profile, config.authority.register_timeout())
                .await
            {
                Ok(()) => {
                    info!(device_id = %profile.device_id, "Device registered");
                    report.registered = true;
                }
                Err(e) => warn!(error = %e, "Device registration failed"),
            }
        }

        let sync = SyncQueue::new(stores.ledger, authority.clone(), &config);
        let orchestrator = Orchestrator::new(&config, stores.cache, sync, authority, uptime);

        panel.ready();
        feedback.boot_blink().await;
        info!(?report, "Node ready");

        Self {
            monitor: ConnectivityMonitor::new(LinkState::from_connected(report.link)),
            scan_guard: ScanGuard::new(config.timing.scan_guard()),
            debouncer: ButtonDebouncer::new(config.timing.button_debounce()),
            station: Station {
                reader,
                sensor,
                panel,
                feedback,
            },
            link,
            button,
            orchestrator,
            boot_report: report,
            config,
        }
    }

    pub fn boot_report(&self) -> BootReport {
        self.boot_report
    }

    pub fn cache(&self) -> &AuthorizationCache {
        self.orchestrator.cache()
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        self.orchestrator.sync().ledger()
    }

    /// Link state as last recorded by the monitor.
    pub fn link_state(&self) -> LinkState {
        self.monitor.state()
    }

    /// Usable only when the monitor and the live interface both say up.
    fn live_link(&self) -> LinkState {
        LinkState::from_connected(self.monitor.state().is_up() && self.link.is_connected())
    }

    /// Run the control loop until `shutdown` resolves.
    pub async fn run<F: Future>(mut self, shutdown: F) {
        let timing = self.config.timing.clone();
        let start = Instant::now();

        let mut link_tick = interval_at(
            start + timing.link_check_interval(),
            timing.link_check_interval(),
        );
        let mut sync_tick = interval_at(
            start + self.config.sync.interval(),
            self.config.sync.interval(),
        );
        let mut poll_tick = interval(timing.loop_interval());
        link_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        info!("Control loop started");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = link_tick.tick() => {
                    self.check_link().await;
                }
                _ = sync_tick.tick() => {
                    self.periodic_sync().await;
                }
                _ = poll_tick.tick() => {
                    self.check_button().await;
                    self.poll_reader().await;
                }
            }
        }

        self.station.feedback.all_off();
        info!("Control loop stopped");
    }

    /// One reader tick. Returns the outcome if a card was handled.
    pub async fn poll_reader(&mut self) -> Option<Outcome> {
        if !self.scan_guard.is_open(Instant::now()) {
            return None;
        }
        let serial = self.station.reader.poll_card().await?;
        self.scan_guard.mark(Instant::now());

        let outcome = match CredentialUid::from_bytes(&serial) {
            Ok(uid) => {
                let link = self.live_link();
                Some(
                    self.orchestrator
                        .handle_scan(&uid, link, &mut self.station)
                        .await,
                )
            }
            Err(e) => {
                warn!(error = %e, "Unreadable card serial");
                None
            }
        };

        self.station.reader.halt().await;
        outcome
    }

    /// One link check. A reconnection flushes the ledger.
    pub async fn check_link(&mut self) -> Option<LinkEvent> {
        let connected = self.link.is_connected();
        if !connected {
            debug!("Link down, asking interface to reconnect");
            self.link.connect().await;
        }

        let change = self.monitor.poll(connected)?;
        let flush = self.orchestrator.on_link_change(change).await;
        Some(LinkEvent { change, flush })
    }

    /// Scheduled flush; skipped while offline.
    pub async fn periodic_sync(&mut self) -> Option<FlushReport> {
        if !self.live_link().is_up() {
            debug!("Offline, periodic sync skipped");
            return None;
        }
        Some(self.orchestrator.periodic_sync().await)
    }

    /// One button tick. Returns `true` if the status screens were shown.
    pub async fn check_button(&mut self) -> bool {
        let pressed = self.button.is_pressed();
        if !self.debouncer.update(pressed, Instant::now()) {
            return false;
        }
        self.show_status().await;
        true
    }

    async fn show_status(&mut self) {
        let connected = self.link.is_connected();
        let address = self
            .link
            .local_address()
            .filter(|_| connected)
            .unwrap_or_else(|| "No Connection".to_string());
        let panel = &mut self.station.panel;

        panel.show(if connected { "WiFi: OK" } else { "WiFi: OFF" }, &address);
        sleep(STATUS_HOLD).await;

        let short_id: String = self.config.device.id.chars().take(8).collect();
        panel.show(
            &format!("Device: {short_id}"),
            &format!("Location: {}", self.config.device.location),
        );
        sleep(STATUS_HOLD).await;
        panel.ready();
    }
}

/// Start the interface and wait for it to associate.
async fn connect(link: &mut dyn LinkProbe, panel: &mut Panel, timeout: Duration) -> bool {
    panel.show("WiFi Connect", "Starting...");
    link.connect().await;

    let steps = (timeout.as_millis() / CONNECT_STEP.as_millis()) as usize;
    let mut progress = String::new();
    for _ in 0..steps {
        if link.is_connected() {
            break;
        }
        sleep(CONNECT_STEP).await;
        progress.push('.');
        panel.show("WiFi Connect", &progress);
    }

    if link.is_connected() {
        let address = link.local_address().unwrap_or_default();
        info!(address = %address, "Link up");
        panel.show("WiFi Connected", &address);
        true
    } else {
        warn!("Link did not come up, starting offline");
        panel.show("WiFi Failed", "Offline Mode");
        false
    }
}
