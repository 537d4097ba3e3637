//! In-process stand-in for the MongoDB driver
//!
//! `FakeClient` implements [`DocumentClient`] without any network I/O. It
//! counts calls, can be switched into a faulted state, and reports the same
//! lifecycle events a real topology would.

use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

use crate::mongodb::{
    DEFAULT_DATABASE, DocumentClient, LifecycleEvent, LifecycleObserver, MongoConfig, TracingSink,
};

static BUILD_ATTEMPTS: LazyLock<Mutex<HashMap<String, usize>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    #[error("invalid connection url: {0}")]
    InvalidUrl(String),

    #[error("server {0} is unreachable")]
    Unreachable(String),

    #[error("command '{command}' failed")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Collection handle produced by [`FakeClient`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeCollection {
    pub database: String,
    pub name: String,
}

#[derive(Debug, Default)]
struct FakeState {
    open_calls: AtomicUsize,
    ping_calls: AtomicUsize,
    close_calls: AtomicUsize,
    last_close_forced: AtomicBool,
    faulted: AtomicBool,
    ping_delay: Mutex<Option<Duration>>,
}

/// Driver stand-in; `fake://host[:port][/database]` or `mongodb://…` URLs
#[derive(Clone, Debug)]
pub struct FakeClient {
    address: String,
    default_database: String,
    observer: LifecycleObserver,
    state: Arc<FakeState>,
}

impl FakeClient {
    /// A client that answers pings, not created through a manager
    pub fn reachable(default_database: &str) -> Self {
        Self {
            address: "fake:27017".to_string(),
            default_database: default_database.to_string(),
            observer: LifecycleObserver::new("fake", Arc::new(TracingSink)),
            state: Arc::default(),
        }
    }

    /// How many times `build` was attempted with exactly this url
    pub fn build_attempts(url: &str) -> usize {
        BUILD_ATTEMPTS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn open_calls(&self) -> usize {
        self.state.open_calls.load(Ordering::SeqCst)
    }

    pub fn ping_calls(&self) -> usize {
        self.state.ping_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    pub fn last_close_forced(&self) -> bool {
        self.state.last_close_forced.load(Ordering::SeqCst)
    }

    /// Make every subsequent `open`/`ping` fail
    pub fn set_faulted(&self, faulted: bool) {
        self.state.faulted.store(faulted, Ordering::SeqCst);
    }

    /// Stall each ping for `delay`
    pub fn set_ping_delay(&self, delay: Option<Duration>) {
        *self
            .state
            .ping_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    fn ping_delay(&self) -> Option<Duration> {
        *self
            .state
            .ping_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reachable(&self) -> Result<(), FakeError> {
        if self.state.faulted.load(Ordering::SeqCst) {
            self.observer
                .notify(LifecycleEvent::Error, &format!("{} heartbeat failed", self.address));
            return Err(FakeError::Unreachable(self.address.clone()));
        }
        Ok(())
    }
}

/// Split `scheme://host/database?query` into host and optional database
fn parse_url(url: &str) -> Result<(String, Option<String>), FakeError> {
    let rest = url
        .strip_prefix("fake://")
        .or_else(|| url.strip_prefix("mongodb://"))
        .ok_or_else(|| FakeError::InvalidUrl(url.to_string()))?;

    let rest = rest.split('?').next().unwrap_or_default();
    let (host, database) = match rest.split_once('/') {
        Some((host, db)) if !db.is_empty() => (host, Some(db.to_string())),
        Some((host, _)) => (host, None),
        None => (rest, None),
    };

    if host.is_empty() {
        return Err(FakeError::InvalidUrl(url.to_string()));
    }
    Ok((host.to_string(), database))
}

#[async_trait]
impl DocumentClient for FakeClient {
    type Collection = FakeCollection;
    type Error = FakeError;

    async fn build(config: &MongoConfig, observer: LifecycleObserver) -> Result<Self, Self::Error> {
        *BUILD_ATTEMPTS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(config.url.clone())
            .or_default() += 1;

        let (address, database) = parse_url(config.url())?;
        Ok(Self {
            address,
            default_database: database.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            observer,
            state: Arc::default(),
        })
    }

    fn default_database_name(&self) -> String {
        self.default_database.clone()
    }

    fn collection(&self, database: &str, name: &str) -> Result<Self::Collection, Self::Error> {
        Ok(FakeCollection {
            database: database.to_string(),
            name: name.to_string(),
        })
    }

    async fn open(&self) -> Result<(), Self::Error> {
        let first = self.state.open_calls.fetch_add(1, Ordering::SeqCst) == 0;
        self.check_reachable()?;
        if first {
            self.observer.notify(LifecycleEvent::Connecting, "");
            self.observer
                .notify(LifecycleEvent::ServerOpening, &self.address);
        }
        Ok(())
    }

    async fn ping(&self, _database: &str) -> Result<Document, Self::Error> {
        self.state.ping_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.ping_delay() {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;
        Ok(doc! { "ok": 1.0 })
    }

    async fn close(&self, force: bool) -> Result<(), Self::Error> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.last_close_forced.store(force, Ordering::SeqCst);
        self.observer
            .notify(LifecycleEvent::ServerClosed, &self.address);
        self.observer.notify(LifecycleEvent::Closed, "");
        Ok(())
    }
}
