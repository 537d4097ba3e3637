//! Shared test utilities for the data-source crates
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestDataBuilder`: collision-free database and manager names (always available)
//!
//! # Usage
//!
//! Add `features = ["mongo"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["mongo"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestMongo};
//!
//! #[tokio::test]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let names = TestDataBuilder::from_test_name("my_mongo_test");
//!     let url = mongo.url_for(&names.database("movies"));
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

/// MongoDB rejects database names of 64 bytes or more
const MAX_DATABASE_NAME: usize = 63;

/// Builder for per-test resource names
///
/// Names derived from the same seed are stable, so a failing test can be
/// inspected; `unique()` gives a fresh seed when runs share a server.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed derived from the test name
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Random seed
    pub fn unique() -> Self {
        let (high, _) = Uuid::new_v4().as_u64_pair();
        Self::new(high)
    }

    /// Database name for `purpose`, e.g. `test_movies_3f2a…`
    pub fn database(&self, purpose: &str) -> String {
        let mut name = format!("test_{}_{:016x}", purpose.replace(['.', ' ', '/'], "_"), self.seed);
        name.truncate(MAX_DATABASE_NAME);
        name
    }

    /// Manager registration name for `suffix`
    pub fn manager_name(&self, suffix: &str) -> String {
        format!("test-manager-{:x}-{}", self.seed, suffix)
    }
}
