pub mod tracing;

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Deployment environment, selected by `APP_ENV`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// `APP_ENV=production` (any case) selects production; anything else is development
    pub fn from_env() -> Self {
        match env::var("APP_ENV") {
            Ok(value) if value.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Value of `key`, or `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Value of `key`, or `MissingEnvVar`
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Value of `key` when set and non-blank
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse `key` when set; unset or blank yields `Ok(None)`
pub fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_optional(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
                key: key.to_string(),
                details: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        for value in ["production", "PRODUCTION", "Production"] {
            temp_env::with_var("APP_ENV", Some(value), || {
                assert_eq!(Environment::from_env(), Environment::Production);
            });
        }
    }

    #[test]
    fn test_environment_unknown_defaults_to_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("CORE_CONFIG_TEST_VAR", Some("value"), || {
            assert_eq!(env_or_default("CORE_CONFIG_TEST_VAR", "default"), "value");
        });
        temp_env::with_var_unset("CORE_CONFIG_TEST_VAR", || {
            assert_eq!(env_or_default("CORE_CONFIG_TEST_VAR", "default"), "default");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("CORE_CONFIG_REQUIRED", || {
            let err = env_required("CORE_CONFIG_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("CORE_CONFIG_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_optional_treats_blank_as_unset() {
        temp_env::with_var("CORE_CONFIG_OPTIONAL", Some("  "), || {
            assert_eq!(env_optional("CORE_CONFIG_OPTIONAL"), None);
        });
        temp_env::with_var("CORE_CONFIG_OPTIONAL", Some("app"), || {
            assert_eq!(env_optional("CORE_CONFIG_OPTIONAL").as_deref(), Some("app"));
        });
    }

    #[test]
    fn test_env_parse() {
        temp_env::with_var("CORE_CONFIG_NUMBER", Some(" 42 "), || {
            assert_eq!(env_parse::<u32>("CORE_CONFIG_NUMBER"), Ok(Some(42)));
        });
        temp_env::with_var_unset("CORE_CONFIG_NUMBER", || {
            assert_eq!(env_parse::<u32>("CORE_CONFIG_NUMBER"), Ok(None));
        });
        temp_env::with_var("CORE_CONFIG_NUMBER", Some("many"), || {
            let err = env_parse::<u32>("CORE_CONFIG_NUMBER").unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "CORE_CONFIG_NUMBER"));
        });
    }
}
