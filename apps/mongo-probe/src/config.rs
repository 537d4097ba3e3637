use core_config::FromEnv;

use mongo_datasource::mongodb::ManagerSettings;

pub use core_config::Environment;

/// Probe configuration, read once at startup
#[derive(Clone, Debug)]
pub struct Config {
    pub manager: ManagerSettings,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let manager = ManagerSettings::from_env()?;

        Ok(Self {
            manager,
            environment,
        })
    }
}
