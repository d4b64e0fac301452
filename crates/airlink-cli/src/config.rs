//! Configuration loading: TOML file with environment variable overrides.
//!
//! The file is optional and every field has a default, so an empty config
//! is valid (it just has no devices). `AIRLINK_LOG` and then `RUST_LOG`
//! override the logging filter.
//!
//! ```toml
//! [logging]
//! filter = "info,airlink_session=debug"
//!
//! [transport]
//! bind_address = "0.0.0.0"
//! response_timeout_ms = 2000
//!
//! [session]
//! tick_interval_ms = 100
//! retry_delay_ms = 2000
//!
//! [[devices]]
//! name = "bedroom"
//! address = "192.168.1.50"
//! ```

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use airlink_core::constants::{
    DEFAULT_PORT, DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_RETRY_DELAY_MS, DEFAULT_TICK_INTERVAL_MS,
};
use airlink_network::UdpTransportConfig;
use airlink_session::SessionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub transport: TransportConfig,
    pub session: SessionSettings,
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Local address each exchange binds to.
    pub bind_address: IpAddr,
    pub response_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub tick_interval_ms: u64,
    pub retry_delay_ms: u64,
}

/// One air conditioner on the LAN.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl DeviceConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl Config {
    /// Load `path` (if present), apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the result fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(filter) = lookup("AIRLINK_LOG") {
            self.logging.filter = filter;
        }
        if let Some(filter) = lookup("RUST_LOG") {
            self.logging.filter = filter;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "session.tick_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.session.retry_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "session.retry_delay_ms must be non-zero".to_string(),
            ));
        }
        if self.transport.response_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "transport.response_timeout_ms must be non-zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.is_empty() {
                return Err(ConfigError::Validation("device name must not be empty".to_string()));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device name {}",
                    device.name
                )));
            }
            if device.port == 0 {
                return Err(ConfigError::Validation(format!(
                    "device {} has port 0",
                    device.name
                )));
            }
        }
        Ok(())
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.name == name)
    }

    pub fn transport_config(&self) -> UdpTransportConfig {
        UdpTransportConfig {
            timeout: Duration::from_millis(self.transport.response_timeout_ms),
            bind_addr: SocketAddr::new(self.transport.bind_address, 0),
            broadcast: false,
        }
    }

    pub fn session_config(&self, device: &DeviceConfig) -> SessionConfig {
        SessionConfig {
            address: device.socket_addr(),
            tick_interval: Duration::from_millis(self.session.tick_interval_ms),
            retry_delay: Duration::from_millis(self.session.retry_delay_ms),
        }
    }
}
