//! Registry lookups that fail with typed errors instead of `None`
//!
//! Each helper performs exactly one registry query. Nothing is cached.

use std::sync::Arc;

use super::client::DocumentClient;
use super::manager::MongoManager;
use crate::common::{DatasourceError, DatasourceResult};
use crate::registry::DataSourceRegistry;

fn manager_name<R: DataSourceRegistry + ?Sized>(registry: &R, name: Option<&str>) -> String {
    name.map(str::to_string)
        .unwrap_or_else(|| registry.default_manager())
}

/// Manager registered under `name`, or the registry's default
///
/// # Example
///
/// ```ignore
/// use mongo_datasource::mongodb::{MongoClient, lookup};
///
/// let manager = lookup::get_manager::<MongoClient, _>(&registry, Some("catalog"))?;
/// let health = manager.health_check().await;
/// ```
pub fn get_manager<C, R>(registry: &R, name: Option<&str>) -> DatasourceResult<Arc<MongoManager<C>>>
where
    C: DocumentClient,
    R: DataSourceRegistry + ?Sized,
{
    let name = manager_name(registry, name);
    let entry = registry
        .get_manager(&name)
        .ok_or_else(|| DatasourceError::manager_not_found(&name))?;

    entry.downcast::<MongoManager<C>>().map_err(|_| {
        DatasourceError::invalid_config(format!("manager '{}' is not a MongoDB manager", name))
    })
}

/// Client owned by the manager registered under `name`, or the default
pub fn get_connection<C, R>(registry: &R, name: Option<&str>) -> DatasourceResult<Arc<C>>
where
    C: DocumentClient,
    R: DataSourceRegistry + ?Sized,
{
    let name = manager_name(registry, name);
    let entry = registry
        .get_connection(&name)
        .ok_or_else(|| DatasourceError::manager_not_found(&name))?;

    entry.downcast::<C>().map_err(|_| {
        DatasourceError::invalid_config(format!(
            "connection of manager '{}' is not a MongoDB client",
            name
        ))
    })
}

/// Collection `model` in the default manager
pub fn get_model<C, R>(registry: &R, model: &str) -> DatasourceResult<C::Collection>
where
    C: DocumentClient,
    R: DataSourceRegistry + ?Sized,
{
    resolve_model::<C, R>(registry, manager_name(registry, None), model)
}

/// Collection `model` in the manager registered under `manager`
pub fn get_model_from<C, R>(registry: &R, manager: &str, model: &str) -> DatasourceResult<C::Collection>
where
    C: DocumentClient,
    R: DataSourceRegistry + ?Sized,
{
    resolve_model::<C, R>(registry, manager.to_string(), model)
}

fn resolve_model<C, R>(registry: &R, manager: String, model: &str) -> DatasourceResult<C::Collection>
where
    C: DocumentClient,
    R: DataSourceRegistry + ?Sized,
{
    let entry = registry
        .get_model(&manager, model)
        .ok_or_else(|| DatasourceError::model_not_found(model, Some(&manager)))?;

    entry
        .downcast::<C::Collection>()
        .map(|collection| *collection)
        .map_err(|_| {
            DatasourceError::invalid_config(format!(
                "model '{}' of manager '{}' is not a MongoDB collection",
                model, manager
            ))
        })
}
