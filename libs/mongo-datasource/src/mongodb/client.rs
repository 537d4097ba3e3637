use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use mongodb::event::EventHandler;
use mongodb::event::sdam::SdamEvent;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use super::config::{ConnectionOptions, MongoConfig};
use super::events::LifecycleObserver;

/// Database used when the connection string does not name one
pub const DEFAULT_DATABASE: &str = "test";

/// The driver surface a manager needs
///
/// Implemented by [`MongoClient`]. Tests plug in a fake so lifecycle and
/// probe behaviour can be checked without a server.
#[async_trait]
pub trait DocumentClient: Send + Sync + Sized + 'static {
    /// Handle returned for a named collection
    type Collection: Clone + Send + Sync + 'static;

    /// Error raised by driver calls, propagated to callers unchanged
    type Error: StdError + Send + Sync + 'static;

    /// Create a configured client without opening a connection
    ///
    /// `observer` must receive every lifecycle event the client reports.
    async fn build(config: &MongoConfig, observer: LifecycleObserver) -> Result<Self, Self::Error>;

    /// Database named in the connection string, or [`DEFAULT_DATABASE`]
    fn default_database_name(&self) -> String;

    /// Collection handle; never touches the network
    ///
    /// Fails only with the client's own construction error.
    fn collection(&self, database: &str, name: &str) -> Result<Self::Collection, Self::Error>;

    /// Establish the connection. Repeated calls are harmless.
    async fn open(&self) -> Result<(), Self::Error>;

    /// Run `{ ping: 1 }` against `database`
    async fn ping(&self, database: &str) -> Result<Document, Self::Error>;

    /// Close the connection; `force` skips waiting for in-flight operations
    async fn close(&self, force: bool) -> Result<(), Self::Error>;
}

/// Copy the options that are set onto the parsed driver options
///
/// Unset fields keep whatever the connection string specified.
fn apply_options(target: &mut ClientOptions, options: &ConnectionOptions) {
    if let Some(ref app_name) = options.app_name {
        target.app_name = Some(app_name.clone());
    }
    if let Some(max) = options.max_pool_size {
        target.max_pool_size = Some(max);
    }
    if let Some(min) = options.min_pool_size {
        target.min_pool_size = Some(min);
    }
    if let Some(timeout) = options.connect_timeout() {
        target.connect_timeout = Some(timeout);
    }
    if let Some(timeout) = options.server_selection_timeout() {
        target.server_selection_timeout = Some(timeout);
    }
    if let Some(direct) = options.direct_connection {
        target.direct_connection = Some(direct);
    }
}

/// Driver client created on first use
///
/// Building one only parses the connection string. The driver starts
/// monitoring the topology as soon as a [`mongodb::Client`] exists, so that
/// client is created by the first `open`, `ping` or `collection` call.
pub struct MongoClient {
    options: ClientOptions,
    default_database: String,
    client: OnceLock<Client>,
    init: Mutex<()>,
}

impl MongoClient {
    /// The driver client, created on the first call
    ///
    /// Fails only when the driver rejects the options at client creation,
    /// e.g. an unreadable TLS certificate file.
    pub fn client(&self) -> Result<&Client, mongodb::error::Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::with_options(self.options.clone())?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Whether the driver client exists yet
    pub fn is_started(&self) -> bool {
        self.client.get().is_some()
    }
}

impl fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoClient")
            .field("hosts", &self.options.hosts)
            .field("default_database", &self.default_database)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentClient for MongoClient {
    type Collection = Collection<Document>;
    type Error = mongodb::error::Error;

    async fn build(config: &MongoConfig, observer: LifecycleObserver) -> Result<Self, Self::Error> {
        let mut options = ClientOptions::parse(config.url()).await?;
        apply_options(&mut options, &config.options);
        options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
            observer.on_sdam(&event)
        }));

        let default_database = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        Ok(Self {
            options,
            default_database,
            client: OnceLock::new(),
            init: Mutex::new(()),
        })
    }

    fn default_database_name(&self) -> String {
        self.default_database.clone()
    }

    fn collection(&self, database: &str, name: &str) -> Result<Self::Collection, Self::Error> {
        Ok(self.client()?.database(database).collection::<Document>(name))
    }

    async fn open(&self) -> Result<(), Self::Error> {
        // The driver connects lazily; a ping forces server selection.
        self.ping(&self.default_database).await.map(|_| ())
    }

    async fn ping(&self, database: &str) -> Result<Document, Self::Error> {
        self.client()?
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
    }

    async fn close(&self, force: bool) -> Result<(), Self::Error> {
        // Nothing to tear down when the client was never created.
        if let Some(client) = self.client.get() {
            client.clone().shutdown().immediate(force).await;
        }
        Ok(())
    }
}
