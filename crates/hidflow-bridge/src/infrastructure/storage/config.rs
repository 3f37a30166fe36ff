//! TOML-based configuration for the bridge.
//!
//! The file is optional. Every field has a serde default, so a missing file,
//! an empty file, or a file with only some sections all yield a working
//! configuration:
//!
//! ```toml
//! [bridge]
//! server_url = "tcp://192.168.1.30:24800"
//! client_name = "desk-pi"
//! log_level = "info"
//!
//! [screen]
//! width = 2560
//! height = 1440
//!
//! [hid]
//! keyboard_device = "/dev/hidg0"
//! mouse_device = "/dev/hidg1"
//! ```
//!
//! The driver re-reads its settings every tick through
//! [`FileConfigSource`], which reloads the file when its modification time
//! changes and keeps the last good configuration if the new one is broken.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use hidflow_core::SessionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::driver::{ConfigSource, RuntimeSettings};
use crate::application::reconnect::{Endpoint, EndpointError, RECONNECT_INTERVAL};
use crate::infrastructure::hid_output::gadget::{DEFAULT_KEYBOARD_DEVICE, DEFAULT_MOUSE_DEVICE};
use crate::infrastructure::network::CONNECT_TIMEOUT;

/// How often [`FileConfigSource`] checks the file's modification time.
pub const CONFIG_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `server_url` does not name a usable endpoint.
    #[error("invalid server_url: {0}")]
    Endpoint(#[from] EndpointError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub hid: HidConfig,
}

/// Connection and process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// `host[:port]`, optionally prefixed with `tcp://`, `synergy://`, or
    /// `deskflow://`. Empty disables the connection.
    #[serde(default)]
    pub server_url: String,
    /// Screen name announced to the server.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Period of the driver loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Geometry of the virtual screen announced to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: u16,
    #[serde(default = "default_screen_height")]
    pub height: u16,
}

/// HID output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HidConfig {
    /// Minimum spacing between pointer reports.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
    #[serde(default = "default_keyboard_device")]
    pub keyboard_device: PathBuf,
    #[serde(default = "default_mouse_device")]
    pub mouse_device: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_client_name() -> String {
    hidflow_core::session::DEFAULT_CLIENT_NAME.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_tick_interval_ms() -> u64 {
    4
}
fn default_reconnect_interval_secs() -> u64 {
    RECONNECT_INTERVAL.as_secs()
}
fn default_connect_timeout_secs() -> u64 {
    CONNECT_TIMEOUT.as_secs()
}
fn default_screen_width() -> u16 {
    hidflow_core::session::DEFAULT_SCREEN_WIDTH
}
fn default_screen_height() -> u16 {
    hidflow_core::session::DEFAULT_SCREEN_HEIGHT
}
fn default_report_interval_ms() -> u64 {
    8
}
fn default_keyboard_device() -> PathBuf {
    PathBuf::from(DEFAULT_KEYBOARD_DEVICE)
}
fn default_mouse_device() -> PathBuf {
    PathBuf::from(DEFAULT_MOUSE_DEVICE)
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            client_name: default_client_name(),
            log_level: default_log_level(),
            tick_interval_ms: default_tick_interval_ms(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: default_report_interval_ms(),
            keyboard_device: default_keyboard_device(),
            mouse_device: default_mouse_device(),
        }
    }
}

impl BridgeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

impl HidConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

impl AppConfig {
    /// Derives the values the driver needs every tick.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Endpoint`] if `server_url` is malformed.
    pub fn runtime_settings(&self) -> Result<RuntimeSettings, ConfigError> {
        Ok(RuntimeSettings {
            endpoint: Endpoint::parse(&self.bridge.server_url)?,
            session: SessionConfig::new(&self.bridge.client_name, self.screen.width, self.screen.height),
        })
    }
}

/// Values given on the command line, applied on top of every load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub client_name: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.server_url {
            config.bridge.server_url = url.clone();
        }
        if let Some(name) = &self.client_name {
            config.bridge.client_name = name.clone();
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Renders `config` as the TOML text [`load_config`] accepts.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if serialization fails.
pub fn render_config(config: &AppConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A [`ConfigSource`] backed by a TOML file that may change while running.
#[derive(Debug)]
pub struct FileConfigSource {
    path: PathBuf,
    overrides: ConfigOverrides,
    config: AppConfig,
    settings: RuntimeSettings,
    modified: Option<SystemTime>,
    last_check: Option<Instant>,
    check_interval: Duration,
}

impl FileConfigSource {
    /// Loads the file once.
    ///
    /// # Errors
    ///
    /// Unlike later reloads, a broken file at startup is an error.
    pub fn open(path: impl Into<PathBuf>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let path = path.into();
        let modified = modified_time(&path);
        let mut config = load_config(&path)?;
        overrides.apply(&mut config);
        let settings = config.runtime_settings()?;
        Ok(Self {
            path,
            overrides,
            config,
            settings,
            modified,
            last_check: None,
            check_interval: CONFIG_CHECK_INTERVAL,
        })
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Reloads the file if its modification time changed.
    ///
    /// Returns `true` if new settings took effect.
    pub fn reload_if_changed(&mut self) -> bool {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return false;
        }
        self.modified = modified;

        let loaded = load_config(&self.path).and_then(|mut config| {
            self.overrides.apply(&mut config);
            let settings = config.runtime_settings()?;
            Ok((config, settings))
        });
        match loaded {
            Ok((config, settings)) => {
                info!(path = %self.path.display(), "configuration reloaded");
                self.config = config;
                self.settings = settings;
                true
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring broken configuration, keeping previous");
                false
            }
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn current(&mut self) -> &RuntimeSettings {
        let now = Instant::now();
        let due = self
            .last_check
            .is_none_or(|last| now.saturating_duration_since(last) >= self.check_interval);
        if due {
            self.last_check = Some(now);
            self.reload_if_changed();
        }
        &self.settings
    }
}

/// A [`ConfigSource`] whose settings only change when told to.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource(pub RuntimeSettings);

impl ConfigSource for StaticConfigSource {
    fn current(&mut self) -> &RuntimeSettings {
        &self.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
