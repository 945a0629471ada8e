//! Service configuration
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [paths]
//! model_dir = "my_cloud/definition"
//! output_dir = "staging/definition"
//!
//! [logging]
//! filter = "cmodel_sync=debug,info"
//!
//! [write]
//! dry_run_by_default = false
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default tracing filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Top-level service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Model directories
    pub paths: PathsConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Write behavior
    pub write: WriteConfig,
}

/// `[paths]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Model tree that is read
    pub model_dir: PathBuf,
    /// Tree that receives writes; the model tree when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            output_dir: None,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// `[write]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Treat every write as a dry run unless told otherwise
    pub dry_run_by_default: bool,
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With model directory
    #[inline]
    #[must_use]
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.model_dir = dir.into();
        self
    }

    /// With output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.output_dir = Some(dir.into());
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.logging.filter = filter.into();
        self
    }

    /// With dry run as the default write mode
    #[inline]
    #[must_use]
    pub fn with_dry_run_by_default(mut self, dry_run: bool) -> Self {
        self.write.dry_run_by_default = dry_run;
        self
    }

    /// Model directory
    #[inline]
    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.paths.model_dir
    }

    /// Directory that receives writes
    #[inline]
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        self.paths.output_dir.as_deref().unwrap_or(self.paths.model_dir.as_path())
    }

    /// Log filter directive
    #[inline]
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.logging.filter
    }

    /// Whether writes are dry runs unless told otherwise
    #[inline]
    #[must_use]
    pub fn dry_run_by_default(&self) -> bool {
        self.write.dry_run_by_default
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::ReadFailed` if the file cannot be read
    /// - `ConfigError::ParseFailed` if it is not valid TOML for this schema
    /// - `ConfigError::Invalid` if a value is unusable
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_relative_to(base);
        tracing::debug!(config = %path.display(), model_dir = %config.model_dir().display(), "loaded config");
        Ok(config)
    }

    /// Check values that parse but cannot be used
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first bad key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.model_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "paths.model_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Make relative directories absolute against `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if self.paths.model_dir.is_relative() {
            self.paths.model_dir = base.join(&self.paths.model_dir);
        }
        if let Some(dir) = self.paths.output_dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}
