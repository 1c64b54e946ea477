//! # Environment-Based Configuration
//!
//! Server settings are read from environment variables so deployments can
//! tune the hub without a rebuild.
//!
//! ## Environment Variables
//!
//! - `FORUM_BIND_ADDR` - Listen address (default: 127.0.0.1:8080)
//! - `FORUM_DATABASE_PATH` - SQLite database file; messages stay in memory when unset
//! - `FORUM_ENABLE_CORS` - Enable permissive CORS (default: true)
//! - `FORUM_HISTORY_MAX_LIMIT` - Largest history page served (default: 100)
//!
//! ### Hub
//! - `FORUM_OUTBOUND_QUEUE_CAPACITY` - Pending frames per connection (default: 256)
//! - `FORUM_PERSIST_TIMEOUT` - Message persistence deadline, e.g. `3s`, `500ms` (default: 3s)
//! - `FORUM_SORT_TIMEOUT` - Recency lookup deadline (default: 2s)
//! - `FORUM_MAX_MESSAGE_SIZE` - Largest inbound frame in bytes (default: 65536)
//! - `FORUM_DUPLICATE_LOGIN` - `replace` or `reject` (default: replace)

use crate::config::{DuplicateLoginPolicy, HubConfig};
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub enable_cors: bool,
    pub history_max_limit: usize,
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_path: None,
            enable_cors: true,
            history_max_limit: 100,
            hub: HubConfig::default(),
        }
    }
}

/// Builder for `ServerConfig` with environment variable support
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    bind_addr: SocketAddr,
    database_path: Option<PathBuf>,
    enable_cors: bool,
    history_max_limit: usize,
    outbound_queue_capacity: usize,
    persist_timeout: Duration,
    sort_timeout: Duration,
    max_message_size: usize,
    duplicate_login: DuplicateLoginPolicy,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            bind_addr: server.bind_addr,
            database_path: server.database_path,
            enable_cors: server.enable_cors,
            history_max_limit: server.history_max_limit,
            outbound_queue_capacity: server.hub.outbound_queue_capacity,
            persist_timeout: server.hub.persist_timeout,
            sort_timeout: server.hub.sort_timeout,
            max_message_size: server.hub.max_message_size,
            duplicate_login: server.hub.duplicate_login,
        }
    }
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(addr) = get_env_parsed::<SocketAddr>("FORUM_BIND_ADDR")? {
            builder = builder.bind_addr(addr);
        }
        if let Some(path) = get_env_string("FORUM_DATABASE_PATH") {
            builder = builder.database_path(PathBuf::from(path));
        }
        if let Some(cors) = get_env_bool("FORUM_ENABLE_CORS")? {
            builder = builder.enable_cors(cors);
        }
        if let Some(limit) = get_env_parsed::<usize>("FORUM_HISTORY_MAX_LIMIT")? {
            builder = builder.history_max_limit(limit);
        }

        if let Some(capacity) = get_env_parsed::<usize>("FORUM_OUTBOUND_QUEUE_CAPACITY")? {
            builder = builder.outbound_queue_capacity(capacity);
        }
        if let Some(timeout) = get_env_duration("FORUM_PERSIST_TIMEOUT")? {
            builder = builder.persist_timeout(timeout);
        }
        if let Some(timeout) = get_env_duration("FORUM_SORT_TIMEOUT")? {
            builder = builder.sort_timeout(timeout);
        }
        if let Some(size) = get_env_parsed::<usize>("FORUM_MAX_MESSAGE_SIZE")? {
            builder = builder.max_message_size(size);
        }
        if let Some(policy) = get_env_parsed::<DuplicateLoginPolicy>("FORUM_DUPLICATE_LOGIN")? {
            builder = builder.duplicate_login(policy);
        }

        Ok(builder)
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.database_path = Some(path);
        self
    }

    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    pub fn history_max_limit(mut self, limit: usize) -> Self {
        self.history_max_limit = limit;
        self
    }

    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity;
        self
    }

    pub fn persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    pub fn sort_timeout(mut self, timeout: Duration) -> Self {
        self.sort_timeout = timeout;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn duplicate_login(mut self, policy: DuplicateLoginPolicy) -> Self {
        self.duplicate_login = policy;
        self
    }

    /// Validate configuration and build `ServerConfig`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if any value is out of range.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        if self.history_max_limit == 0 || self.history_max_limit > 1000 {
            return Err(ConfigError::ValidationError(
                "history_max_limit must be between 1 and 1000".to_string(),
            ));
        }

        let hub = HubConfig::builder()
            .outbound_queue_capacity(self.outbound_queue_capacity)
            .and_then(|b| b.persist_timeout(self.persist_timeout))
            .and_then(|b| b.sort_timeout(self.sort_timeout))
            .and_then(|b| b.max_message_size(self.max_message_size))
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?
            .duplicate_login(self.duplicate_login)
            .build();

        Ok(ServerConfig {
            bind_addr: self.bind_addr,
            database_path: self.database_path,
            enable_cors: self.enable_cors,
            history_max_limit: self.history_max_limit,
            hub,
        })
    }
}

// Environment variable helper functions

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.is_empty())
}

fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        Err(_) => Ok(None),
    }
}

fn get_env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_duration(key: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(val) => humantime::parse_duration(val.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid duration '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
