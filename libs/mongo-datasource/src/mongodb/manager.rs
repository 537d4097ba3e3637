use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::client::{DocumentClient, MongoClient};
use super::config::{ConnectionOptions, ManagerSettings};
use super::events::{LifecycleObserver, LifecycleSink, TracingSink};
use super::health::{self, HealthCheckResult};
use crate::common::{DatasourceError, DatasourceResult};

/// Owns one named connection to a MongoDB deployment
///
/// The manager never connects on its own. Build it, register it, then call
/// [`connect`](Self::connect).
///
/// # Example
///
/// ```ignore
/// use mongo_datasource::mongodb::{ManagerSettings, MongoConfig, MongoDbManager};
///
/// let manager = MongoDbManager::new(ManagerSettings::named(
///     "catalog",
///     MongoConfig::new("mongodb://localhost:27017/catalog"),
/// ))
/// .await?;
/// manager.connect().await?;
///
/// let movies = manager.model("movies")?;
/// let archived = manager.model("archive.movies")?;
/// ```
pub struct MongoManager<C: DocumentClient = MongoClient> {
    name: String,
    default_database: String,
    options: ConnectionOptions,
    client: Arc<C>,
}

/// Manager over the real MongoDB driver
pub type MongoDbManager = MongoManager<MongoClient>;

/// `"MongoDB <epoch-millis>_<6 hex>"`; the hex comes from a v4 UUID
pub fn generate_name() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("MongoDB {}_{}", Utc::now().timestamp_millis(), &random[..6])
}

/// Split a model name into (database, collection)
///
/// Only the first `.` separates: `"a.b.c"` is collection `b.c` in database
/// `a`. Without a dot, or with an empty database segment, the default
/// database is used.
pub fn resolve_model_name<'a>(name: &'a str, default_database: &'a str) -> (&'a str, &'a str) {
    match name.split_once('.') {
        Some(("", collection)) => (default_database, collection),
        Some((database, collection)) => (database, collection),
        None => (default_database, name),
    }
}

impl<C: DocumentClient> MongoManager<C> {
    /// Create the client and register lifecycle logging through `tracing`
    ///
    /// Fails with `InvalidManagerConfig` for an empty url (before any driver
    /// call) or one the driver cannot parse. Opens no socket.
    pub async fn new(settings: impl Into<ManagerSettings>) -> DatasourceResult<Self> {
        Self::with_sink(settings, Arc::new(TracingSink)).await
    }

    /// Same as [`new`](Self::new), with lifecycle events sent to `sink`
    pub async fn with_sink(
        settings: impl Into<ManagerSettings>,
        sink: Arc<dyn LifecycleSink>,
    ) -> DatasourceResult<Self> {
        let settings = settings.into();
        settings.config.validate()?;

        let name = settings
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(generate_name);

        let observer = LifecycleObserver::new(name.as_str(), sink);
        let client = C::build(&settings.config, observer).await.map_err(|e| {
            DatasourceError::invalid_config(format!(
                "cannot create client for manager '{}': {}",
                name, e
            ))
        })?;
        let default_database = client.default_database_name();

        debug!(manager = %name, database = %default_database, "MongoDB manager created");

        Ok(Self {
            name,
            default_database,
            options: settings.config.options,
            client: Arc::new(client),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database used for models without a database prefix
    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Establish the connection
    ///
    /// Errors are the driver's own, unwrapped.
    #[instrument(skip(self), fields(manager = %self.name))]
    pub async fn connect(&self) -> Result<(), C::Error> {
        self.client.open().await?;
        info!("MongoDB manager connected");
        Ok(())
    }

    /// The owned client
    pub fn connection(&self) -> &C {
        &self.client
    }

    /// The owned client as a shared handle, for callers that outlive a borrow
    pub fn shared_connection(&self) -> Arc<C> {
        Arc::clone(&self.client)
    }

    /// Collection handle for `name`, see [`resolve_model_name`]
    ///
    /// Never reports a missing collection; the server creates collections
    /// lazily. The only error is the client's own construction error.
    pub fn model(&self, name: &str) -> Result<C::Collection, C::Error> {
        let (database, collection) = resolve_model_name(name, &self.default_database);
        self.client.collection(database, collection)
    }

    /// Close the connection
    ///
    /// With `force` the driver does not wait for in-flight operations.
    #[instrument(skip(self), fields(manager = %self.name))]
    pub async fn close_connection(&self, force: bool) -> Result<(), C::Error> {
        self.client.close(force).await?;
        info!("MongoDB manager closed");
        Ok(())
    }

    /// Whether a `ping` against the default database succeeds
    ///
    /// Needs no admin privileges. Every failure, including an expired
    /// `health_check_timeout_ms`, yields `false`.
    #[instrument(skip(self), fields(manager = %self.name))]
    pub async fn is_connected(&self) -> bool {
        let timeout = self.options.health_check_timeout();
        match health::ping_within(self.client.as_ref(), &self.default_database, timeout).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "MongoDB ping failed");
                false
            }
        }
    }

    /// Probe the connection and report a structured verdict
    ///
    /// Safe to call unconditionally from a liveness timer: every outcome is a
    /// [`HealthCheckResult`].
    #[instrument(skip(self), fields(manager = %self.name))]
    pub async fn health_check(&self) -> HealthCheckResult {
        let result = health::probe(
            &self.name,
            self.client.as_ref(),
            &self.default_database,
            self.options.health_check_timeout(),
        )
        .await;

        if result.healthy {
            debug!(latency_ms = result.latency, "MongoDB health check passed");
        } else {
            warn!(latency_ms = result.latency, message = %result.message, "MongoDB health check failed");
        }
        result
    }
}

impl<C: DocumentClient> fmt::Debug for MongoManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoManager")
            .field("name", &self.name)
            .field("default_database", &self.default_database)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
