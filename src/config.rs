//! Application configuration

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::BottleDriftError;

const ENV_PREFIX: &str = "BOTTLEDRIFT";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DriftConfig {
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub tick_interval: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Outbound messages buffered per viewer before it is evicted
    pub queue_capacity: usize,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub ping_interval: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub pong_timeout: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub write_timeout: Duration,
    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            tick_interval: crate::scheduler::DEFAULT_TICK_INTERVAL,
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        let pong_timeout = Duration::from_secs(60);
        Self {
            queue_capacity: crate::hub::DEFAULT_QUEUE_CAPACITY,
            ping_interval: pong_timeout * 9 / 10,
            pong_timeout,
            write_timeout: Duration::from_secs(10),
            max_message_size: 512,
        }
    }
}

impl AppConfig {
    /// Load from `config/default.*` (optional) and `BOTTLEDRIFT__*`
    /// environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(File::with_name("config/default").required(false))
    }

    /// Load from a specific file, still allowing environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::builder(File::from(path))
    }

    fn builder<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), BottleDriftError> {
        self.database.validate()?;
        self.drift.validate()?;
        self.websocket.validate()?;
        Ok(())
    }
}

fn invalid(message: &str) -> BottleDriftError {
    BottleDriftError::ConfigurationError {
        message: message.to_string(),
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), BottleDriftError> {
        if self.url.trim().is_empty() {
            return Err(invalid("Database URL cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(invalid("Database pool needs at least one connection"));
        }
        Ok(())
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), BottleDriftError> {
        if self.tick_interval.is_zero() {
            return Err(invalid("Drift tick interval must be greater than zero"));
        }
        Ok(())
    }
}

impl WebSocketConfig {
    pub fn validate(&self) -> Result<(), BottleDriftError> {
        if self.queue_capacity == 0 {
            return Err(invalid("WebSocket queue capacity must be greater than zero"));
        }
        if self.ping_interval.is_zero() || self.write_timeout.is_zero() {
            return Err(invalid("WebSocket intervals must be greater than zero"));
        }
        if self.ping_interval >= self.pong_timeout {
            return Err(invalid("WebSocket ping interval must be shorter than pong timeout"));
        }
        Ok(())
    }
}
