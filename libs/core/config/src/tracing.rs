use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Default filter when `RUST_LOG` is unset
const DEVELOPMENT_FILTER: &str = "info,mongo_datasource=debug,mongodb=warn";
const PRODUCTION_FILTER: &str = "warn,mongo_datasource::lifecycle=info";

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in main() before any fallible operations. Safe to call
/// multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Filter used for `environment` unless `RUST_LOG` overrides it
pub fn default_filter(environment: &Environment) -> &'static str {
    if environment.is_production() {
        PRODUCTION_FILTER
    } else {
        DEVELOPMENT_FILTER
    }
}

/// Initialize tracing with environment-aware output and error span capture.
///
/// - **Production** (`APP_ENV=production`): flattened JSON lines, no targets
/// - **Development** (default): pretty, human-readable output
///
/// Both include `tracing_error::ErrorLayer`. `RUST_LOG` overrides the level
/// filter. Later calls are no-ops, which keeps tests that share a process
/// quiet.
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(environment)));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => info!(?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized, skipping re-initialization"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_per_environment() {
        assert!(default_filter(&Environment::Development).contains("mongo_datasource=debug"));
        assert!(default_filter(&Environment::Production).starts_with("warn"));
    }

    #[test]
    fn test_init_tracing_multiple_calls() {
        init_tracing(&Environment::Development);
        init_tracing(&Environment::Production);
    }

    #[test]
    fn test_init_tracing_with_rust_log_env() {
        temp_env::with_var("RUST_LOG", Some("trace"), || {
            init_tracing(&Environment::Development);
        });
    }
}
