//! Connection lifecycle observers
//!
//! The driver reports topology changes through SDAM events. A manager wires a
//! fixed set of them to a [`LifecycleSink`] once, at construction. Observers
//! only log; they never influence results or errors.

use mongodb::event::sdam::SdamEvent;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Lifecycle transitions a manager reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Topology opening, a connection attempt started
    Connecting,
    /// A server in the topology became reachable
    ServerOpening,
    /// A server in the topology became unreachable
    ServerClosed,
    /// The whole connection was torn down
    Closed,
    /// An asynchronous connection-level error occurred
    Error,
}

/// Event → (level, message) table applied to every manager
pub static LIFECYCLE_EVENTS: [(LifecycleEvent, Level, &str); 5] = [
    (LifecycleEvent::Connecting, Level::INFO, "connection attempt started"),
    (LifecycleEvent::ServerOpening, Level::INFO, "server became reachable"),
    (LifecycleEvent::ServerClosed, Level::WARN, "server became unreachable"),
    (LifecycleEvent::Closed, Level::INFO, "connection closed"),
    (LifecycleEvent::Error, Level::ERROR, "connection error"),
];

impl LifecycleEvent {
    // Variants are declared in table order.
    fn entry(self) -> &'static (LifecycleEvent, Level, &'static str) {
        &LIFECYCLE_EVENTS[self as usize]
    }

    pub fn level(self) -> Level {
        self.entry().1
    }

    pub fn message(self) -> &'static str {
        self.entry().2
    }

    /// Map a driver SDAM event onto the lifecycle table
    ///
    /// Returns `None` for events the manager does not report
    /// (description changes, heartbeat chatter).
    pub fn from_sdam(event: &SdamEvent) -> Option<(Self, String)> {
        match event {
            SdamEvent::TopologyOpening(_) => Some((Self::Connecting, String::new())),
            SdamEvent::ServerOpening(ev) => Some((Self::ServerOpening, ev.address.to_string())),
            SdamEvent::ServerClosed(ev) => Some((Self::ServerClosed, ev.address.to_string())),
            SdamEvent::TopologyClosed(_) => Some((Self::Closed, String::new())),
            SdamEvent::ServerHeartbeatFailed(ev) => Some((
                Self::Error,
                format!("{}: {}", ev.server_address, ev.failure),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::ServerOpening => "serverOpening",
            Self::ServerClosed => "serverClosed",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Destination for lifecycle log lines
#[cfg_attr(test, mockall::automock)]
pub trait LifecycleSink: Send + Sync {
    fn record(&self, manager: &str, event: LifecycleEvent, detail: &str);
}

/// Default sink writing through the process-wide `tracing` dispatcher
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LifecycleSink for TracingSink {
    fn record(&self, manager: &str, event: LifecycleEvent, detail: &str) {
        let message = event.message();
        let level = event.level();
        if level == Level::ERROR {
            tracing::error!(target: "mongo_datasource::lifecycle", manager, %event, detail, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(target: "mongo_datasource::lifecycle", manager, %event, detail, "{}", message);
        } else {
            tracing::info!(target: "mongo_datasource::lifecycle", manager, %event, detail, "{}", message);
        }
    }
}

/// A sink bound to one manager's name
///
/// Cheap to clone; the client keeps one inside its driver callback.
#[derive(Clone)]
pub struct LifecycleObserver {
    manager: Arc<str>,
    sink: Arc<dyn LifecycleSink>,
}

impl LifecycleObserver {
    pub fn new(manager: impl Into<Arc<str>>, sink: Arc<dyn LifecycleSink>) -> Self {
        Self {
            manager: manager.into(),
            sink,
        }
    }

    pub fn manager(&self) -> &str {
        &self.manager
    }

    pub fn notify(&self, event: LifecycleEvent, detail: &str) {
        self.sink.record(&self.manager, event, detail);
    }

    pub fn on_sdam(&self, event: &SdamEvent) {
        if let Some((event, detail)) = LifecycleEvent::from_sdam(event) {
            self.notify(event, &detail);
        }
    }
}

impl fmt::Debug for LifecycleObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleObserver")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}
