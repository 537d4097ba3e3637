//! MongoDB backend for the data-source registry
//!
//! Provides the manager, its lifecycle logging, the health probe, and the
//! typed registry lookups.

mod client;
mod config;
mod events;
mod health;
pub mod lookup;
mod manager;

pub use client::{DEFAULT_DATABASE, DocumentClient, MongoClient};
pub use config::{ConnectionOptions, ManagerSettings, MongoConfig};
#[cfg(test)]
pub use events::MockLifecycleSink;
pub use events::{LIFECYCLE_EVENTS, LifecycleEvent, LifecycleObserver, LifecycleSink, TracingSink};
pub use health::{HealthCheckResult, HealthDetails, ProbeError, describe_error, is_ready};
pub use lookup::{get_connection, get_manager, get_model, get_model_from};
pub use manager::{MongoDbManager, MongoManager, generate_name, resolve_model_name};

// Re-export MongoDB types for convenience
pub use mongodb::bson::Document;
pub use mongodb::{Client, Collection, Database};
