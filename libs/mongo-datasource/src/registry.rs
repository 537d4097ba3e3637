//! The registry contract the lookup helpers consume
//!
//! A registry maps names to managers of any backend kind. Values cross the
//! contract type-erased; the helpers in [`crate::mongodb::lookup`] check they
//! are the kind they expect.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::common::{DatasourceError, DatasourceResult};
use crate::mongodb::{DocumentClient, MongoManager};

/// Type-erased shared value handed out by a registry
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased owned value handed out by a registry
pub type AnyBox = Box<dyn Any + Send + Sync>;

/// Name used by [`ManagerRegistry::default`]
pub const DEFAULT_MANAGER: &str = "default";

/// Lookups a data-source registry answers
///
/// Every call is a fresh query; implementations should not expect callers
/// to cache results.
#[cfg_attr(test, mockall::automock)]
pub trait DataSourceRegistry: Send + Sync {
    /// Name used when a lookup does not specify one
    fn default_manager(&self) -> String;

    fn get_manager(&self, name: &str) -> Option<AnyArc>;

    fn get_connection(&self, name: &str) -> Option<AnyArc>;

    fn get_model(&self, manager: &str, model: &str) -> Option<AnyBox>;
}

/// Object-safe face of a manager held by [`ManagerRegistry`]
pub trait RegisteredManager: Send + Sync + 'static {
    /// Backend tag, e.g. `"mongodb"`
    fn kind(&self) -> &'static str;

    fn into_any(self: Arc<Self>) -> AnyArc;

    fn connection_any(&self) -> AnyArc;

    fn model_any(&self, model: &str) -> Option<AnyBox>;
}

impl<C: DocumentClient> RegisteredManager for MongoManager<C> {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    fn into_any(self: Arc<Self>) -> AnyArc {
        self
    }

    fn connection_any(&self) -> AnyArc {
        self.shared_connection()
    }

    fn model_any(&self, model: &str) -> Option<AnyBox> {
        match self.model(model) {
            Ok(collection) => Some(Box::new(collection)),
            Err(e) => {
                warn!(manager = %self.name(), model, error = %e, "Cannot create collection handle");
                None
            }
        }
    }
}

/// In-memory registry keyed by registration name
pub struct ManagerRegistry {
    default_manager: String,
    managers: RwLock<HashMap<String, Arc<dyn RegisteredManager>>>,
}

impl ManagerRegistry {
    pub fn new(default_manager: impl Into<String>) -> Self {
        Self {
            default_manager: default_manager.into(),
            managers: RwLock::new(HashMap::new()),
        }
    }

    /// Add `manager` under `name`
    ///
    /// Names are unique; registering a taken name is a configuration error.
    pub fn register<M: RegisteredManager>(
        &self,
        name: impl Into<String>,
        manager: Arc<M>,
    ) -> DatasourceResult<()> {
        let name = name.into();
        let mut managers = self.managers.write().unwrap_or_else(PoisonError::into_inner);

        if managers.contains_key(&name) {
            return Err(DatasourceError::invalid_config(format!(
                "a manager named '{}' is already registered",
                name
            )));
        }

        debug!(manager = %name, kind = manager.kind(), "Manager registered");
        managers.insert(name, manager);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn RegisteredManager>> {
        self.managers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn entry(&self, name: &str) -> Option<Arc<dyn RegisteredManager>> {
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl Default for ManagerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MANAGER)
    }
}

impl DataSourceRegistry for ManagerRegistry {
    fn default_manager(&self) -> String {
        self.default_manager.clone()
    }

    fn get_manager(&self, name: &str) -> Option<AnyArc> {
        self.entry(name).map(|manager| manager.into_any())
    }

    fn get_connection(&self, name: &str) -> Option<AnyArc> {
        self.entry(name).map(|manager| manager.connection_any())
    }

    fn get_model(&self, manager: &str, model: &str) -> Option<AnyBox> {
        self.entry(manager).and_then(|manager| manager.model_any(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mongodb::{ManagerSettings, MongoConfig};
    use crate::testing::{FakeClient, FakeCollection};

    async fn fake_manager(name: &str) -> Arc<MongoManager<FakeClient>> {
        Arc::new(
            MongoManager::new(ManagerSettings::named(
                name,
                MongoConfig::new("fake://localhost/testdb"),
            ))
            .await
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ManagerRegistry::default();
        registry.register("primary", fake_manager("primary").await).unwrap();

        assert_eq!(registry.names(), vec!["primary".to_string()]);
        assert!(registry.get_manager("primary").is_some());
        assert!(registry.get_manager("other").is_none());

        let connection = registry.get_connection("primary").unwrap();
        assert!(connection.downcast::<FakeClient>().is_ok());

        let model = registry.get_model("primary", "movies").unwrap();
        let model = model.downcast::<FakeCollection>().unwrap();
        assert_eq!(model.name, "movies");
        assert!(registry.get_model("other", "movies").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let registry = ManagerRegistry::default();
        registry.register("primary", fake_manager("a").await).unwrap();

        let err = registry
            .register("primary", fake_manager("b").await)
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = ManagerRegistry::new("primary");
        registry.register("primary", fake_manager("primary").await).unwrap();

        let removed = registry.unregister("primary").unwrap();
        assert_eq!(removed.kind(), "mongodb");
        assert!(registry.get_manager("primary").is_none());
        assert_eq!(registry.default_manager(), "primary");
    }
}
