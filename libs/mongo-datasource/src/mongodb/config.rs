#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_optional, env_parse};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::{DatasourceError, DatasourceResult};

/// Client options forwarded to the driver
///
/// Every field is optional. Unset fields leave the driver's own default
/// (or whatever the connection string specifies) untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// Application name reported in server logs
    pub app_name: Option<String>,

    /// Maximum number of connections in the pool
    pub max_pool_size: Option<u32>,

    /// Minimum number of connections in the pool
    pub min_pool_size: Option<u32>,

    /// Connection timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Server selection timeout in seconds
    pub server_selection_timeout_secs: Option<u64>,

    /// Connect to the given host only, skipping topology discovery
    pub direct_connection: Option<bool>,

    /// Deadline for `is_connected` and `health_check` probes in milliseconds.
    ///
    /// Not a driver option. When unset the probe waits as long as the
    /// driver's own command execution does.
    pub health_check_timeout_ms: Option<u64>,
}

impl ConnectionOptions {
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_pool_size(mut self, max_pool_size: u32, min_pool_size: u32) -> Self {
        self.max_pool_size = Some(max_pool_size);
        self.min_pool_size = Some(min_pool_size);
        self
    }

    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout_secs.map(Duration::from_secs)
    }

    pub fn health_check_timeout(&self) -> Option<Duration> {
        self.health_check_timeout_ms.map(Duration::from_millis)
    }
}

/// Connection settings for one MongoDB manager
///
/// # Example
///
/// ```ignore
/// use mongo_datasource::mongodb::{ConnectionOptions, MongoConfig};
///
/// let config = MongoConfig::new("mongodb://localhost:27017/testdb")
///     .with_options(ConnectionOptions::default().with_app_name("catalog"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConfig {
    /// MongoDB connection URL (required)
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub options: ConnectionOptions,
}

impl MongoConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: ConnectionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reject settings that can never produce a client
    ///
    /// Runs before any driver call, so a bad config never reaches the network.
    pub fn validate(&self) -> DatasourceResult<()> {
        if self.url.trim().is_empty() {
            return Err(DatasourceError::invalid_config(
                "config.url is required and must not be empty",
            ));
        }

        if let (Some(min), Some(max)) = (self.options.min_pool_size, self.options.max_pool_size) {
            if min > max {
                return Err(DatasourceError::invalid_config(format!(
                    "minPoolSize ({}) must not exceed maxPoolSize ({})",
                    min, max
                )));
            }
        }

        Ok(())
    }
}

/// Registration descriptor for a manager
///
/// `name` is optional; a unique one is generated when it is missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSettings {
    #[serde(default)]
    pub name: Option<String>,

    pub config: MongoConfig,
}

impl ManagerSettings {
    pub fn new(config: MongoConfig) -> Self {
        Self { name: None, config }
    }

    pub fn named(name: impl Into<String>, config: MongoConfig) -> Self {
        Self {
            name: Some(name.into()),
            config,
        }
    }
}

impl From<MongoConfig> for ManagerSettings {
    fn from(config: MongoConfig) -> Self {
        Self::new(config)
    }
}

/// Load MongoConfig from environment variables
///
/// Environment variables:
/// - `MONGODB_URL` or `MONGO_URL` (required) - MongoDB connection string
/// - `MONGODB_APP_NAME` (optional) - Application name for server logs
/// - `MONGODB_MAX_POOL_SIZE` / `MONGODB_MIN_POOL_SIZE` (optional)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (optional)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (optional)
/// - `MONGODB_DIRECT_CONNECTION` (optional)
/// - `MONGODB_HEALTH_CHECK_TIMEOUT_MS` (optional)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("MONGODB_URL")
            .or_else(|_| std::env::var("MONGO_URL"))
            .map_err(|_| ConfigError::MissingEnvVar("MONGODB_URL or MONGO_URL".to_string()))?;

        let options = ConnectionOptions {
            app_name: env_optional("MONGODB_APP_NAME"),
            max_pool_size: env_parse("MONGODB_MAX_POOL_SIZE")?,
            min_pool_size: env_parse("MONGODB_MIN_POOL_SIZE")?,
            connect_timeout_secs: env_parse("MONGODB_CONNECT_TIMEOUT_SECS")?,
            server_selection_timeout_secs: env_parse("MONGODB_SERVER_SELECTION_TIMEOUT_SECS")?,
            direct_connection: env_parse("MONGODB_DIRECT_CONNECTION")?,
            health_check_timeout_ms: env_parse("MONGODB_HEALTH_CHECK_TIMEOUT_MS")?,
        };

        Ok(Self { url, options })
    }
}

/// `MongoConfig::from_env` plus an optional `MONGODB_MANAGER_NAME`
#[cfg(feature = "config")]
impl FromEnv for ManagerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            name: env_optional("MONGODB_MANAGER_NAME"),
            config: MongoConfig::from_env()?,
        })
    }
}
