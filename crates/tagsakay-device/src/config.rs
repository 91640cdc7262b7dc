//! # Kiosk Configuration
//!
//! Configuration management for the kiosk runtime.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TAGSAKAY_API_KEY=...                                               │
//! │     TAGSAKAY_DEVICE_ID=A4CF120B9E01                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tagsakay-kiosk/kiosk.toml (Linux)                        │
//! │     ~/Library/Application Support/com.tagsakay.kiosk/kiosk.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     3 retries, 1s base delay, 60s heartbeat, 1.5s debounce             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kiosk.toml
//! [device]
//! name = "Gate 1 Scanner"
//! location = "Gate 1"
//!
//! [server]
//! base_url = "https://api.tagsakay.com"
//! api_key = "dev-key"
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 1000
//!
//! [timing]
//! heartbeat_interval_secs = 60
//! poll_interval_secs = 5
//!
//! [peripherals]
//! led_port = "/dev/ttyUSB0"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use tagsakay_core::{RetryPolicy, DEVICE_NAME};

use crate::error::{DeviceError, DeviceResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Who this kiosk is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Explicit device id. When absent the id is derived from the MAC.
    #[serde(default)]
    pub id: Option<String>,

    /// MAC read from hardware fuses, if the platform exposes one.
    #[serde(default)]
    pub hardware_mac: Option<String>,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Where the kiosk is installed (e.g., "Gate 1").
    #[serde(default)]
    pub location: String,

    /// Send a device registration request during startup.
    #[serde(default)]
    pub register_on_boot: bool,
}

fn default_device_name() -> String {
    DEVICE_NAME.to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: None,
            hardware_mac: None,
            name: default_device_name(),
            location: String::new(),
            register_on_boot: false,
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Where the TagSakay API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL (http:// or https://).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as `x-api-key` on every request.
    #[serde(default)]
    pub api_key: String,

    /// Per-attempt request timeout (milliseconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://api.tagsakay.com".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            base_url: default_base_url(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Retry behaviour for server calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_true")]
    pub exponential: bool,

    /// Failures in a row before the kiosk goes offline.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_max_consecutive_failures() -> u32 {
    5
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
            exponential: true,
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

// =============================================================================
// Timing Settings
// =============================================================================

/// Intervals and timeouts driving the control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Same-tag suppression window (milliseconds).
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_status_report_interval")]
    pub status_report_interval_secs: u64,

    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_secs: u64,

    /// Control loop tick (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Idle keypad input is discarded after this (milliseconds).
    #[serde(default = "default_key_input_timeout")]
    pub key_input_timeout_ms: u64,

    /// How long a scan result stays up before the idle screen returns
    /// (milliseconds).
    #[serde(default = "default_result_display")]
    pub result_display_ms: u64,

    /// First health re-check delay while offline (milliseconds).
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,

    /// Upper bound on the health re-check delay (seconds).
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_secs: u64,
}

fn default_debounce() -> u64 {
    1500
}
fn default_heartbeat_interval() -> u64 {
    60
}
fn default_poll_interval() -> u64 {
    5
}
fn default_status_report_interval() -> u64 {
    300
}
fn default_registration_timeout() -> u64 {
    120
}
fn default_tick_interval() -> u64 {
    250
}
fn default_key_input_timeout() -> u64 {
    5000
}
fn default_result_display() -> u64 {
    2000
}
fn default_reconnect_initial() -> u64 {
    5000
}
fn default_reconnect_max() -> u64 {
    60
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings {
            debounce_ms: default_debounce(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            poll_interval_secs: default_poll_interval(),
            status_report_interval_secs: default_status_report_interval(),
            registration_timeout_secs: default_registration_timeout(),
            tick_interval_ms: default_tick_interval(),
            key_input_timeout_ms: default_key_input_timeout(),
            result_display_ms: default_result_display(),
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_secs: default_reconnect_max(),
        }
    }
}

// =============================================================================
// Peripheral Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeripheralSettings {
    /// Serial device for the LED matrix. Lines go to stdout when unset.
    #[serde(default)]
    pub led_port: Option<PathBuf>,

    #[serde(default = "default_led_ack_timeout")]
    pub led_ack_timeout_ms: u64,
}

fn default_led_ack_timeout() -> u64 {
    200
}

impl Default for PeripheralSettings {
    fn default() -> Self {
        PeripheralSettings {
            led_port: None,
            led_ack_timeout_ms: default_led_ack_timeout(),
        }
    }
}

// =============================================================================
// Main Kiosk Configuration
// =============================================================================

/// Complete kiosk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub timing: TimingSettings,

    #[serde(default)]
    pub peripherals: PeripheralSettings,
}

impl KioskConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kiosk.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DeviceResult<Self> {
        let mut config = Self::from_file(config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load kiosk config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Reads the file alone, without env overrides or validation.
    fn from_file(config_path: Option<PathBuf>) -> DeviceResult<Self> {
        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading kiosk config from file");
                let contents = std::fs::read_to_string(&path)?;
                return Ok(toml::from_str(&contents)?);
            }
            debug!(?path, "Config file not found, using defaults");
        }
        Ok(Self::default())
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DeviceResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DeviceError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Kiosk config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DeviceResult<()> {
        if self.server.api_key.trim().is_empty() {
            return Err(DeviceError::MissingApiKey);
        }

        let url = url::Url::parse(&self.server.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(DeviceError::InvalidUrl(format!(
                "Server URL must start with http:// or https://, got: {}",
                self.server.base_url
            )));
        }

        let intervals = [
            ("server.request_timeout_ms", self.server.request_timeout_ms),
            ("timing.heartbeat_interval_secs", self.timing.heartbeat_interval_secs),
            ("timing.poll_interval_secs", self.timing.poll_interval_secs),
            (
                "timing.status_report_interval_secs",
                self.timing.status_report_interval_secs,
            ),
            (
                "timing.registration_timeout_secs",
                self.timing.registration_timeout_secs,
            ),
            ("timing.tick_interval_ms", self.timing.tick_interval_ms),
            ("timing.result_display_ms", self.timing.result_display_ms),
            ("timing.reconnect_initial_ms", self.timing.reconnect_initial_ms),
            ("timing.reconnect_max_secs", self.timing.reconnect_max_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(DeviceError::InvalidConfig(format!(
                "{name} must be greater than 0"
            )));
        }

        if self.retry.max_consecutive_failures == 0 {
            return Err(DeviceError::InvalidConfig(
                "retry.max_consecutive_failures must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("TAGSAKAY_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = Some(id);
        }

        if let Ok(name) = std::env::var("TAGSAKAY_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(location) = std::env::var("TAGSAKAY_LOCATION") {
            self.device.location = location;
        }

        if let Ok(url) = std::env::var("TAGSAKAY_API_URL") {
            debug!(url = %url, "Overriding server URL from environment");
            self.server.base_url = url;
        }

        if let Ok(key) = std::env::var("TAGSAKAY_API_KEY") {
            self.server.api_key = key;
        }

        if let Ok(port) = std::env::var("TAGSAKAY_LED_PORT") {
            self.peripherals.led_port = Some(PathBuf::from(port));
        }

        if let Ok(retries) = std::env::var("TAGSAKAY_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.retry.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid TAGSAKAY_MAX_RETRIES"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tagsakay", "kiosk")
            .map(|dirs| dirs.config_dir().join("kiosk.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
            self.retry.exponential,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    pub fn led_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.peripherals.led_ack_timeout_ms)
    }
}

impl TimingSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn status_report_interval(&self) -> Duration {
        Duration::from_secs(self.status_report_interval_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn key_input_timeout(&self) -> Duration {
        Duration::from_millis(self.key_input_timeout_ms)
    }

    pub fn result_display(&self) -> Duration {
        Duration::from_millis(self.result_display_ms)
    }

    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> KioskConfig {
        let mut config = KioskConfig::default();
        config.server.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = KioskConfig::default();
        assert_eq!(config.device.name, "TagSakay Scanner");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.max_consecutive_failures, 5);
        assert_eq!(config.timing.debounce(), Duration::from_millis(1500));
        assert_eq!(config.timing.registration_timeout(), Duration::from_secs(120));
        assert_eq!(config.timing.result_display(), Duration::from_millis(2000));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            KioskConfig::default().validate(),
            Err(DeviceError::MissingApiKey)
        ));

        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.server.base_url = "ftp://files.example".to_string();
        assert!(matches!(config.validate(), Err(DeviceError::InvalidUrl(_))));

        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.timing.poll_interval_secs = 0;
        assert!(matches!(config.validate(), Err(DeviceError::InvalidConfig(_))));
    }

    /// Removes the listed variables when dropped.
    struct EnvGuard(&'static [&'static str]);

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for name in self.0 {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard(&[
            "TAGSAKAY_DEVICE_ID",
            "TAGSAKAY_DEVICE_NAME",
            "TAGSAKAY_LOCATION",
            "TAGSAKAY_API_URL",
            "TAGSAKAY_API_KEY",
            "TAGSAKAY_LED_PORT",
            "TAGSAKAY_MAX_RETRIES",
        ]);
        std::env::set_var("TAGSAKAY_DEVICE_ID", "A4CF120B9E01");
        std::env::set_var("TAGSAKAY_DEVICE_NAME", "North Gate");
        std::env::set_var("TAGSAKAY_LOCATION", "Terminal 2");
        std::env::set_var("TAGSAKAY_API_URL", "http://localhost:8787");
        std::env::set_var("TAGSAKAY_API_KEY", "env-key");
        std::env::set_var("TAGSAKAY_LED_PORT", "/dev/ttyUSB1");
        std::env::set_var("TAGSAKAY_MAX_RETRIES", "1");

        let mut config = KioskConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.device.id.as_deref(), Some("A4CF120B9E01"));
        assert_eq!(config.device.name, "North Gate");
        assert_eq!(config.device.location, "Terminal 2");
        assert_eq!(config.server.base_url, "http://localhost:8787");
        assert_eq!(config.server.api_key, "env-key");
        assert_eq!(
            config.peripherals.led_port,
            Some(PathBuf::from("/dev/ttyUSB1"))
        );
        assert_eq!(config.retry.max_retries, 1);
        assert!(config.validate().is_ok());

        // Unparseable retry count keeps the current value.
        std::env::set_var("TAGSAKAY_MAX_RETRIES", "many");
        config.apply_env_overrides();
        assert_eq!(config.retry.max_retries, 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: KioskConfig = toml::from_str(
            r#"
            [device]
            location = "Gate 1"

            [server]
            api_key = "abc"

            [timing]
            poll_interval_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.device.location, "Gate 1");
        assert_eq!(config.device.name, "TagSakay Scanner");
        assert_eq!(config.timing.poll_interval_secs, 10);
        assert_eq!(config.timing.heartbeat_interval_secs, 60);
        assert_eq!(config.server.request_timeout_ms, 5000);
    }

    #[test]
    fn test_save_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kiosk.toml");

        let mut config = valid_config();
        config.device.location = "Terminal B".to_string();
        config.peripherals.led_port = Some(PathBuf::from("/dev/ttyUSB0"));
        config.save(Some(path.clone())).unwrap();

        let loaded = KioskConfig::from_file(Some(path)).unwrap();
        assert_eq!(loaded.device.location, "Terminal B");
        assert_eq!(
            loaded.peripherals.led_port,
            Some(PathBuf::from("/dev/ttyUSB0"))
        );
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.toml");
        std::fs::write(&path, "[server\napi_key = ").unwrap();

        assert!(matches!(
            KioskConfig::from_file(Some(path)),
            Err(DeviceError::ConfigLoadFailed(_))
        ));
    }
}
