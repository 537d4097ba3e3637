//! One-shot MongoDB health probe
//!
//! Registers a single manager built from `MONGODB_*` environment variables,
//! resolves it back through the registry, and prints the health report as
//! JSON. Exits non-zero when the deployment is unhealthy.

use core_config::tracing::{init_tracing, install_color_eyre};
use mongo_datasource::ManagerRegistry;
use mongo_datasource::mongodb::{self, MongoClient, MongoDbManager};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let manager = MongoDbManager::new(config.manager).await?;
    let name = manager.name().to_string();
    info!(manager = %name, database = manager.default_database(), "Manager created");

    let registry = ManagerRegistry::new(&name);
    registry.register(&name, Arc::new(manager))?;

    let manager = mongodb::get_manager::<MongoClient, _>(&registry, None)?;

    // A failed connect still gets probed so the report carries the cause
    if let Err(e) = manager.connect().await {
        error!(manager = %name, error = %e, "Initial connection failed");
    }

    let report = manager.health_check().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Err(e) = manager.close_connection(false).await {
        warn!(manager = %name, error = %e, "Close failed");
    }

    if report.healthy && report.details.is_ready {
        info!(manager = %name, latency_ms = report.latency, "Probe succeeded");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
