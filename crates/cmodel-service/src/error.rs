//! Service error types

use cmodel_sync::{ReadError, SyncError, WriteError};
use std::path::PathBuf;

/// Errors loading a [`ServiceConfig`](crate::ServiceConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file cannot be read
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        /// Path of the config file
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the config schema
    #[error("failed to parse config file {path}: {source}")]
    ParseFailed {
        /// Path of the config file
        path: PathBuf,
        /// TOML parser failure
        #[source]
        source: toml::de::Error,
    },

    /// A value is present but unusable
    #[error("invalid value for '{key}': {reason}")]
    Invalid {
        /// Dotted config key
        key: &'static str,
        /// Why the value is rejected
        reason: String,
    },
}

/// Errors surfaced by [`ModelStore`](crate::ModelStore)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The model tree could not be read
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    /// The model tree could not be written
    #[error("write error: {0}")]
    Write(#[from] WriteError),
}

impl From<SyncError> for ServiceError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Read(e) => Self::Read(e),
            SyncError::Write(e) => Self::Write(e),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_errors_keep_their_kind() {
        let err: ServiceError =
            SyncError::Read(ReadError::missing_field("cloudConfig.yml", "cloud.name")).into();
        assert!(matches!(err, ServiceError::Read(ReadError::MissingRequiredField { .. })));
        assert!(err.to_string().contains("cloud.name"));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid {
            key: "logging.filter",
            reason: "empty".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for 'logging.filter': empty");
    }
}
