//! Boot-time configuration
//!
//! Everything the firmware needs is read once at startup from a YAML file and
//! is immutable afterwards. Every field has a default, so an absent file gives
//! the stock board layout: pin 0 as a pulled-up button that stops the server
//! when it reads low.

use crate::gpio::{Direction, Pin, PinId};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "PINPAGE_CONFIG";

/// Environment variable overriding `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

/// Upper bound for `server.max_line_bytes`.
pub const MAX_LINE_BYTES_LIMIT: usize = 64 * 1024;

/// Upper bound for `server.max_lines`.
pub const MAX_LINES_LIMIT: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub pins: Vec<PinConfig>,
    pub gpio: GpioConfig,
    pub page: PageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` to bind the listening socket to
    pub listen_addr: String,
    pub shutdown: Option<ShutdownTrigger>,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Longest accepted request-head line, terminator excluded
    pub max_line_bytes: usize,
    /// Most request-head lines accepted before the blank line
    pub max_lines: usize,
    /// How often a waiting accept wakes up to re-check the shutdown trigger
    pub poll_interval_ms: u64,
    /// Connections handled at once; 1 means inline handling
    pub workers: usize,
}

/// Input pin whose sampled level stops the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ShutdownTrigger {
    pub pin: PinId,
    #[serde(default)]
    pub trigger_level: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub access_point: RoleConfig,
    pub station: RoleConfig,
    /// Upper bound on waiting for the station to associate
    pub connect_timeout_ms: u64,
}

/// One radio role. The access-point and station roles are independent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub enabled: bool,
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinConfig {
    pub id: PinId,
    pub direction: Direction,
    /// Initial level
    #[serde(default)]
    pub value: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// sysfs GPIO directory the pins are read from and written to; `~` runs
    /// without hardware
    pub sysfs_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub title: String,
}

/// Fatal startup errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Yaml(serde_yaml::Error),
    DuplicatePin(PinId),
    UnknownShutdownPin(PinId),
    ShutdownPinNotInput(PinId),
    InvalidLimit(&'static str),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            network: NetworkConfig::default(),
            pins: vec![PinConfig {
                id: 0,
                direction: Direction::Input,
                value: 1,
            }],
            gpio: GpioConfig::default(),
            page: PageConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:80".to_string(),
            shutdown: Some(ShutdownTrigger {
                pin: 0,
                trigger_level: 0,
            }),
            read_timeout_ms: 3000,
            write_timeout_ms: 3000,
            max_line_bytes: 512,
            max_lines: 32,
            poll_interval_ms: 100,
            workers: 1,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            access_point: RoleConfig::default(),
            station: RoleConfig::default(),
            connect_timeout_ms: 10_000,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl PinConfig {
    pub fn to_pin(&self) -> Pin {
        Pin::new(self.id, self.direction, self.value)
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: Some(PathBuf::from("/sys/class/gpio")),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: crate::page::DEFAULT_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to `$PINPAGE_CONFIG`, then to defaults.
    ///
    /// `$LISTEN` overrides the bind address in every case. The result is
    /// validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse without validating or applying environment overrides.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(ConfigError::Yaml)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var(LISTEN_ENV) {
            self.server.listen_addr = addr;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, pin) in self.pins.iter().enumerate() {
            if self.pins[..i].iter().any(|p| p.id == pin.id) {
                return Err(ConfigError::DuplicatePin(pin.id));
            }
        }

        if let Some(trigger) = self.server.shutdown {
            let pin = self
                .pins
                .iter()
                .find(|p| p.id == trigger.pin)
                .ok_or(ConfigError::UnknownShutdownPin(trigger.pin))?;
            if pin.direction != Direction::Input {
                return Err(ConfigError::ShutdownPinNotInput(trigger.pin));
            }
        }

        if !(1..=MAX_LINE_BYTES_LIMIT).contains(&self.server.max_line_bytes) {
            return Err(ConfigError::InvalidLimit("server.max_line_bytes"));
        }
        if !(1..=MAX_LINES_LIMIT).contains(&self.server.max_lines) {
            return Err(ConfigError::InvalidLimit("server.max_lines"));
        }
        if self.server.workers == 0 {
            return Err(ConfigError::InvalidLimit("server.workers"));
        }
        if self.server.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidLimit("server.poll_interval_ms"));
        }

        Ok(())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Yaml(e) => write!(f, "invalid config: {}", e),
            ConfigError::DuplicatePin(id) => write!(f, "pin {} configured more than once", id),
            ConfigError::UnknownShutdownPin(id) => {
                write!(f, "shutdown pin {} is not in the pin list", id)
            }
            ConfigError::ShutdownPinNotInput(id) => {
                write!(f, "shutdown pin {} must be an input", id)
            }
            ConfigError::InvalidLimit(field) => write!(f, "{} is out of range", field),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}
