//! Configuration for wardend

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use warden_authority::DeviceProfile;
use warden_types::DeviceId;

/// Main node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity this node reports to the authority
    #[serde(default)]
    pub device: DeviceConfig,

    /// Authority server endpoint and call timeouts
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Local storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Attendance delivery
    #[serde(default)]
    pub sync: SyncConfig,

    /// Control loop cadences
    #[serde(default)]
    pub timing: TimingConfig,

    /// Biometric verification window
    #[serde(default)]
    pub biometric: BiometricConfig,

    /// Simulated drivers used by the binary
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_id")]
    pub id: String,

    #[serde(default = "default_device_type")]
    pub device_type: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_firmware_version")]
    pub firmware_version: String,

    #[serde(default = "default_features")]
    pub features: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: default_device_id(),
            device_type: default_device_type(),
            location: default_location(),
            firmware_version: default_firmware_version(),
            features: default_features(),
        }
    }
}

impl DeviceConfig {
    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.id.clone())
    }

    /// Profile sent with `device/register`
    pub fn profile(&self) -> DeviceProfile {
        DeviceProfile {
            device_id: self.device_id(),
            device_type: self.device_type.clone(),
            location: self.location.clone(),
            firmware_version: self.firmware_version.clone(),
            features: self.features.clone(),
        }
    }
}

/// Authority server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL of the device API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for `device/register` in milliseconds
    #[serde(default = "default_register_timeout")]
    pub register_timeout_ms: u64,

    /// Timeout for `verify-rfid` in milliseconds
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_ms: u64,

    /// Timeout for the delivery right after a grant in milliseconds
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_ms: u64,

    /// Timeout for each delivery during a flush in milliseconds
    #[serde(default = "default_sync_timeout")]
    pub sync_timeout_ms: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            register_timeout_ms: default_register_timeout(),
            verify_timeout_ms: default_verify_timeout(),
            delivery_timeout_ms: default_delivery_timeout(),
            sync_timeout_ms: default_sync_timeout(),
        }
    }
}

impl AuthorityConfig {
    pub fn register_timeout(&self) -> Duration {
        Duration::from_millis(self.register_timeout_ms)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Volatile storage (for development/testing)
    Memory,

    /// Line logs under a data directory
    File {
        data_dir: PathBuf,

        #[serde(default = "default_cache_file")]
        cache_file: String,

        #[serde(default = "default_ledger_file")]
        ledger_file: String,

        /// Only used in `pending_only` delivery mode
        #[serde(default = "default_acks_file")]
        acks_file: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            data_dir: PathBuf::from("./data"),
            cache_file: default_cache_file(),
            ledger_file: default_ledger_file(),
            acks_file: default_acks_file(),
        }
    }
}

impl StorageConfig {
    /// File storage rooted at `data_dir` with the default file names
    pub fn file(data_dir: impl Into<PathBuf>) -> Self {
        StorageConfig::File {
            data_dir: data_dir.into(),
            cache_file: default_cache_file(),
            ledger_file: default_ledger_file(),
            acks_file: default_acks_file(),
        }
    }
}

/// Which ledger events a flush sends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Every flush sends the whole history; the server deduplicates
    #[default]
    ResendAll,
    /// Only events without a durable acknowledgment are sent
    PendingOnly,
}

/// Attendance sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Periodic flush interval in seconds, while the link is up
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    /// Pause between two deliveries of the same flush in milliseconds
    #[serde(default = "default_sync_spacing")]
    pub spacing_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            interval_secs: default_sync_interval(),
            spacing_ms: default_sync_spacing(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_ms)
    }
}

/// Control loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_link_check_interval")]
    pub link_check_interval_secs: u64,

    /// Reader and button poll cadence in milliseconds
    #[serde(default = "default_loop_interval")]
    pub loop_interval_ms: u64,

    /// Scans closer than this to the previous one are ignored
    #[serde(default = "default_scan_guard")]
    pub scan_guard_ms: u64,

    /// How long the lock stays released on a grant
    #[serde(default = "default_unlock_window")]
    pub unlock_window_ms: u64,

    #[serde(default = "default_button_debounce")]
    pub button_debounce_ms: u64,

    /// How long boot waits for the link to come up
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            link_check_interval_secs: default_link_check_interval(),
            loop_interval_ms: default_loop_interval(),
            scan_guard_ms: default_scan_guard(),
            unlock_window_ms: default_unlock_window(),
            button_debounce_ms: default_button_debounce(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl TimingConfig {
    pub fn link_check_interval(&self) -> Duration {
        Duration::from_secs(self.link_check_interval_secs)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn scan_guard(&self) -> Duration {
        Duration::from_millis(self.scan_guard_ms)
    }

    pub fn unlock_window(&self) -> Duration {
        Duration::from_millis(self.unlock_window_ms)
    }

    pub fn button_debounce(&self) -> Duration {
        Duration::from_millis(self.button_debounce_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Biometric verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiometricConfig {
    /// Length of one capture window in milliseconds
    #[serde(default = "default_window")]
    pub window_ms: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a failed window before the next prompt
    #[serde(default = "default_retry_pause")]
    pub retry_pause_ms: u64,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window(),
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            retry_pause_ms: default_retry_pause(),
        }
    }
}

impl BiometricConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

/// Behaviour of the simulated drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Template id the simulated sensor reports on a match
    #[serde(default = "default_template_id")]
    pub template_id: u16,

    /// Whether the simulated link starts connected
    #[serde(default = "default_true")]
    pub link_up: bool,

    #[serde(default = "default_local_address")]
    pub local_address: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            template_id: default_template_id(),
            link_up: true,
            local_address: default_local_address(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_device_id() -> String {
    "ESP32_001".to_string()
}

fn default_device_type() -> String {
    "ESP32_RFID_READER".to_string()
}

fn default_location() -> String {
    "Main Entrance".to_string()
}

fn default_firmware_version() -> String {
    "1.0.0".to_string()
}

fn default_features() -> Vec<String> {
    ["RFID", "FINGERPRINT", "LCD", "BUZZER", "RELAY"]
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000/api/esp32".to_string()
}

fn default_register_timeout() -> u64 {
    5_000
}

fn default_verify_timeout() -> u64 {
    10_000
}

fn default_delivery_timeout() -> u64 {
    10_000
}

fn default_sync_timeout() -> u64 {
    5_000
}

fn default_cache_file() -> String {
    "cards.txt".to_string()
}

fn default_ledger_file() -> String {
    "attendance.txt".to_string()
}

fn default_acks_file() -> String {
    "attendance.acks".to_string()
}

fn default_sync_interval() -> u64 {
    300
}

fn default_sync_spacing() -> u64 {
    100
}

fn default_link_check_interval() -> u64 {
    30
}

fn default_loop_interval() -> u64 {
    100
}

fn default_scan_guard() -> u64 {
    2_000
}

fn default_unlock_window() -> u64 {
    3_000
}

fn default_button_debounce() -> u64 {
    50
}

fn default_connect_timeout() -> u64 {
    20
}

fn default_window() -> u64 {
    5_000
}

fn default_poll_interval() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_pause() -> u64 {
    1_500
}

fn default_template_id() -> u16 {
    1
}

fn default_local_address() -> String {
    "192.168.4.20".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from defaults, an optional file and `WARDEN__*`
    /// environment variables, in that order.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&NodeConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Field names contain underscores, so sections are split on "__"
        builder = builder.add_source(
            config::Environment::with_prefix("WARDEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Configuration with volatile storage, for tests and demos
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig::Memory,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.device.id, "ESP32_001");
        assert_eq!(config.device.location, "Main Entrance");
        assert_eq!(config.sync.mode, DeliveryMode::ResendAll);
        assert!(matches!(config.storage, StorageConfig::File { .. }));
    }

    #[test]
    fn test_timing_defaults() {
        let timing = TimingConfig::default();
        assert_eq!(timing.link_check_interval(), Duration::from_secs(30));
        assert_eq!(timing.scan_guard(), Duration::from_secs(2));
        assert_eq!(timing.unlock_window(), Duration::from_secs(3));
        assert_eq!(timing.button_debounce(), Duration::from_millis(50));

        let biometric = BiometricConfig::default();
        assert_eq!(biometric.window(), Duration::from_secs(5));
        assert_eq!(biometric.max_attempts, 3);
        assert_eq!(biometric.retry_pause(), Duration::from_millis(1500));
    }

    #[test]
    fn test_authority_timeouts() {
        let authority = AuthorityConfig::default();
        assert_eq!(authority.register_timeout(), Duration::from_secs(5));
        assert_eq!(authority.verify_timeout(), Duration::from_secs(10));
        assert_eq!(authority.sync_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_profile_from_device_config() {
        let profile = DeviceConfig::default().profile();
        assert_eq!(profile.device_id.as_str(), "ESP32_001");
        assert_eq!(profile.features.len(), 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[device]
id = "GATE_7"

[sync]
mode = "pending_only"

[storage]
type = "memory"
"#
        )
        .unwrap();

        let config = NodeConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.device.id, "GATE_7");
        assert_eq!(config.device.location, "Main Entrance");
        assert_eq!(config.sync.mode, DeliveryMode::PendingOnly);
        assert!(matches!(config.storage, StorageConfig::Memory));
    }
}
