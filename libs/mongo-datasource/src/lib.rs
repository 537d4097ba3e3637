//! MongoDB data source for a multi-backend manager registry
//!
//! This library wraps one named MongoDB connection in a manager the registry
//! can host next to other backends. Storage, queries and the wire protocol
//! stay with the official driver.
//!
//! # Features
//!
//! - `config` - Configuration support with `core_config::FromEnv`
//! - `testing` - `FakeClient`, an in-process driver stand-in
//!
//! # Examples
//!
//! ## Direct use
//!
//! ```ignore
//! use mongo_datasource::mongodb::{MongoConfig, MongoDbManager};
//!
//! let manager = MongoDbManager::new(MongoConfig::new("mongodb://localhost:27017/testdb")).await?;
//! manager.connect().await?;
//!
//! let movies = manager.model("movies")?;
//! movies.insert_one(doc! { "title": "X" }).await?;
//!
//! let health = manager.health_check().await;
//! ```
//!
//! ## Through a registry
//!
//! ```ignore
//! use mongo_datasource::mongodb::{self, MongoClient, MongoDbManager};
//! use mongo_datasource::registry::ManagerRegistry;
//!
//! let registry = ManagerRegistry::new("primary");
//! registry.register("primary", Arc::new(manager))?;
//!
//! let manager = mongodb::get_manager::<MongoClient, _>(&registry, None)?;
//! let movies = mongodb::get_model_from::<MongoClient, _>(&registry, "primary", "mydb.movies")?;
//! ```

pub mod common;
pub mod mongodb;
pub mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports for convenience
pub use common::{DatasourceError, DatasourceResult};
pub use registry::{DataSourceRegistry, ManagerRegistry, RegisteredManager};
