//! Error types for the synchronization engine
//!
//! Provides error handling for:
//! - Read operations (model tree → [`Model`](crate::Model))
//! - Write operations ([`Model`](crate::Model) → model tree)
//! - Entity identification inside list sections

use std::path::PathBuf;

/// Errors that abort a read of the model tree
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The primary document is missing or cannot be read
    #[error("cannot read primary document {path}: {source}")]
    MissingOrUnreadablePrimaryDocument {
        /// Path of `cloudConfig.yml`
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// A document other than the primary one cannot be read
    #[error("cannot read {path}: {source}")]
    UnreadableDocument {
        /// Path of the document
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid YAML
    #[error("invalid YAML in {path}: {message}")]
    InvalidYaml {
        /// Path of the document
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A field required in the primary document is absent
    #[error("{path} is missing required field '{field}'")]
    MissingRequiredField {
        /// Path of the primary document
        path: PathBuf,
        /// Dotted name of the absent field
        field: &'static str,
    },

    /// A merged-object section other than pass-through spans several files
    #[error("section '{section}' is defined in multiple files, which is not supported: {files:?}")]
    UnsupportedMultiFileSection {
        /// Section name
        section: String,
        /// Relative names of the files holding it
        files: Vec<String>,
    },

    /// A list entity carries none of the recognized key fields
    #[error("entity #{index} of section '{section}' in {path} has no identifying field: {source}")]
    UnidentifiableEntity {
        /// Relative name of the file holding the list
        path: PathBuf,
        /// Section name
        section: String,
        /// Position of the entity in that file's list
        index: usize,
        /// What was wrong with the entity
        #[source]
        source: KeyFieldError,
    },

    /// The directory tree could not be traversed
    #[error("cannot walk model directory {path}: {message}")]
    Walk {
        /// Path that could not be visited
        path: PathBuf,
        /// Walker message
        message: String,
    },
}

impl ReadError {
    /// Create invalid YAML error for path
    pub fn invalid_yaml(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidYaml {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create missing field error for path
    pub fn missing_field(path: impl Into<PathBuf>, field: &'static str) -> Self {
        Self::MissingRequiredField {
            path: path.into(),
            field,
        }
    }
}

/// Errors that abort a write of the model tree
///
/// Files written before the failure stay written; there is no rollback.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Creating, writing or deleting a file failed
    #[error("io error writing {path}: {source}")]
    FileWriteFailure {
        /// Path being written or removed
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// A document could not be rendered as YAML
    #[error("cannot serialize {path}: {message}")]
    Serialize {
        /// Relative name of the document
        path: PathBuf,
        /// Serializer message
        message: String,
    },

    /// The output directory could not be traversed
    #[error("cannot walk output directory {path}: {message}")]
    Walk {
        /// Path that could not be visited
        path: PathBuf,
        /// Walker message
        message: String,
    },
}

impl WriteError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWriteFailure {
            path: path.into(),
            source,
        }
    }
}

/// Why an entity could not be identified
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFieldError {
    /// The entity is not a mapping
    #[error("entity is not a mapping")]
    NotAMapping,

    /// None of `name`, `id`, `region-name`, `node_name` is present
    #[error("none of name, id, region-name, node_name is present")]
    NoKeyField,

    /// The section's key field is missing on this entity
    #[error("key field '{0}' is missing")]
    MissingField(&'static str),
}

/// Combined engine error
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Reading the tree failed
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    /// Writing the tree failed
    #[error("write error: {0}")]
    Write(#[from] WriteError),
}

/// Result type alias for engine operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = ReadError::missing_field("cloudConfig.yml", "cloud.name");
        assert_eq!(
            err.to_string(),
            "cloudConfig.yml is missing required field 'cloud.name'"
        );
    }

    #[test]
    fn multi_file_display_lists_files() {
        let err = ReadError::UnsupportedMultiFileSection {
            section: "cloud".to_string(),
            files: vec!["a.yml".to_string(), "b.yml".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("'cloud'"));
        assert!(text.contains("b.yml"));
    }

    #[test]
    fn write_error_display() {
        let err = WriteError::io_error(
            "data/servers.yml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("io error writing data/servers.yml"));
    }

    #[test]
    fn error_conversions() {
        let read_err = ReadError::invalid_yaml("x.yml", "bad indent");
        let sync_err: SyncError = read_err.into();
        assert!(matches!(sync_err, SyncError::Read(ReadError::InvalidYaml { .. })));
    }
}
