/// Errors raised by the adapter itself
///
/// Driver errors are never folded into this type. They propagate as the
/// client's own error type so callers can match on them unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasourceError {
    /// Settings are structurally invalid, or a registry entry is not of the expected kind
    #[error("Invalid manager configuration: {message}")]
    InvalidManagerConfig { message: String },

    /// No manager is registered under the requested name
    #[error("Manager '{manager}' not found")]
    ManagerNotFound { manager: String },

    /// The registry could not resolve a model for the requested manager
    #[error("{}", model_not_found_message(.model, .manager.as_deref()))]
    ModelNotFound {
        model: String,
        manager: Option<String>,
    },
}

fn model_not_found_message(model: &str, manager: Option<&str>) -> String {
    match manager {
        Some(manager) => format!("Model '{}' not found in manager '{}'", model, manager),
        None => format!("Model '{}' not found", model),
    }
}

impl DatasourceError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidManagerConfig {
            message: message.into(),
        }
    }

    pub fn manager_not_found(manager: impl Into<String>) -> Self {
        Self::ManagerNotFound {
            manager: manager.into(),
        }
    }

    pub fn model_not_found(model: impl Into<String>, manager: Option<&str>) -> Self {
        Self::ModelNotFound {
            model: model.into(),
            manager: manager.map(str::to_string),
        }
    }
}

/// Result type alias for adapter operations
pub type DatasourceResult<T> = Result<T, DatasourceError>;
