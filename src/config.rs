//! # Configuration Management
//!
//! Configuration for an RCON client and its logging.
//!
//! The crate owns no configuration file of its own; the embedding process supplies an
//! [`RconConfig`] per managed game server. The helpers here cover the common sources.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment variables via `from_env()` (`SQUAD_RCON_*`)
//! - Direct instantiation with defaults
//!
//! ## Notes
//! - Durations are expressed in milliseconds in serialized form
//! - The password never appears in `Debug` output

use crate::core::packet::DEFAULT_MAX_PACKET_SIZE;
use crate::error::{RconError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default RCON port of a Squad server
pub const DEFAULT_RCON_PORT: u16 = 21114;

/// Top-level configuration: one RCON endpoint plus logging
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// RCON endpoint configuration
    #[serde(default)]
    pub rcon: RconConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| RconError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| RconError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| RconError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("SQUAD_RCON_HOST") {
            config.rcon.host = host;
        }

        if let Ok(port) = std::env::var("SQUAD_RCON_PORT") {
            config.rcon.port = port
                .parse::<u16>()
                .map_err(|e| RconError::ConfigError(format!("Invalid SQUAD_RCON_PORT: {e}")))?;
        }

        if let Ok(password) = std::env::var("SQUAD_RCON_PASSWORD") {
            config.rcon.password = password;
        }

        if let Ok(timeout) = std::env::var("SQUAD_RCON_COMMAND_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.rcon.command_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(timeout) = std::env::var("SQUAD_RCON_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.rcon.connect_timeout = Duration::from_millis(val);
                config.rcon.auth_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(flag) = std::env::var("SQUAD_RCON_AUTO_RECONNECT") {
            if let Ok(val) = flag.parse::<bool>() {
                config.rcon.auto_reconnect = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RconError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| RconError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.rcon.validate();
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

fn strict(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(RconError::ConfigError(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

/// Connection and command settings for one game server
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RconConfig {
    /// Server host name or IP address
    pub host: String,

    /// RCON port
    pub port: u16,

    /// RCON password
    pub password: String,

    /// Timeout for opening the TCP socket
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for the server's authentication verdict
    #[serde(with = "duration_serde")]
    pub auth_timeout: Duration,

    /// Deadline for one command round-trip
    #[serde(with = "duration_serde")]
    pub command_timeout: Duration,

    /// Reconnect transparently on demand and in the background after a lost link
    pub auto_reconnect: bool,

    /// Base delay between background reconnect attempts (doubles per attempt)
    #[serde(with = "duration_serde")]
    pub reconnect_delay: Duration,

    /// Maximum background reconnect attempts per lost link
    pub max_reconnect_attempts: u32,

    /// Largest accepted declared packet size in bytes
    pub max_packet_size: usize,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: DEFAULT_RCON_PORT,
            password: String::new(),
            connect_timeout: timeout::DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: timeout::DEFAULT_AUTH_TIMEOUT,
            command_timeout: timeout::DEFAULT_COMMAND_TIMEOUT,
            auto_reconnect: true,
            reconnect_delay: timeout::DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: 10,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

impl fmt::Debug for RconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("auth_timeout", &self.auth_timeout)
            .field("command_timeout", &self.command_timeout)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("max_packet_size", &self.max_packet_size)
            .finish()
    }
}

impl RconConfig {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            ..Self::default()
        }
    }

    /// `host:port` form used in logs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate RCON configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("RCON host cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("RCON port cannot be 0".to_string());
        }

        if self.password.is_empty() {
            errors.push("RCON password cannot be empty".to_string());
        } else if self.password.contains('\0') {
            errors.push("RCON password cannot contain NUL bytes".to_string());
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        if self.auth_timeout.as_millis() < 100 {
            errors.push("Auth timeout too short (minimum: 100ms)".to_string());
        } else if self.auth_timeout.as_secs() > 300 {
            errors.push("Auth timeout too long (maximum: 300s)".to_string());
        }

        if self.command_timeout.as_millis() < 100 {
            errors.push("Command timeout too short (minimum: 100ms)".to_string());
        } else if self.command_timeout.as_secs() > 600 {
            errors.push("Command timeout too long (maximum: 600s)".to_string());
        }

        if self.auto_reconnect && self.max_reconnect_attempts == 0 {
            errors.push(
                "Max reconnect attempts must be greater than 0 when auto_reconnect is enabled"
                    .to_string(),
            );
        }

        if self.reconnect_delay.as_millis() < 10 {
            errors.push("Reconnect delay too short (minimum: 10ms)".to_string());
        } else if self.reconnect_delay.as_secs() > 60 {
            errors.push("Reconnect delay too long (maximum: 60s)".to_string());
        }

        if self.max_packet_size < 4096 {
            errors.push("Max packet size too small (minimum: 4096 bytes)".to_string());
        } else if self.max_packet_size > 64 * 1024 * 1024 {
            errors.push(format!(
                "Max packet size too large: {} bytes (maximum: 64 MB)",
                self.max_packet_size
            ));
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name recorded when logging starts
    pub app_name: String,

    /// Default log level; `RUST_LOG` takes precedence when set
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("squad-rcon"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
