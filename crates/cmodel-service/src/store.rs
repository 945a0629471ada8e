//! Model store
//!
//! Wraps the engine with a per-directory reader/writer lock so that, inside
//! one process, a read never observes a half-applied write. Locks live in a
//! process-wide table keyed by canonical directory path; writers to other
//! directories do not block each other.

use crate::config::ServiceConfig;
use crate::error::ServiceResult;
use cmodel_sync::{check_model, read_model, write_model, ChangeReport, Model, WriteOptions};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type DirectoryLock = Arc<RwLock<()>>;

static DIRECTORY_LOCKS: Lazy<Mutex<HashMap<PathBuf, DirectoryLock>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Canonical form of a directory that may not exist yet
///
/// The deepest existing ancestor is canonicalized and the missing
/// components are joined back on, so the key stays the same once a write
/// creates the directory.
fn lock_key(directory: &Path) -> PathBuf {
    if let Ok(canonical) = directory.canonicalize() {
        return canonical;
    }
    if directory.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            return lock_key(&cwd.join(directory));
        }
    }
    match (directory.parent(), directory.file_name()) {
        (Some(parent), Some(name)) => lock_key(parent).join(name),
        _ => directory.to_path_buf(),
    }
}

/// Lock guarding a directory, shared by every store in the process
fn lock_for(directory: &Path) -> DirectoryLock {
    let key = lock_key(directory);
    let mut locks = DIRECTORY_LOCKS.lock();
    // only the table holds these
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    Arc::clone(locks.entry(key).or_default())
}

/// Reads and writes one model tree
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_dir: PathBuf,
    output_dir: PathBuf,
    dry_run_by_default: bool,
}

impl ModelStore {
    /// Store reading and writing `model_dir`
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        Self {
            output_dir: model_dir.clone(),
            model_dir,
            dry_run_by_default: false,
        }
    }

    /// Store described by a service configuration
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            model_dir: config.model_dir().to_path_buf(),
            output_dir: config.output_dir().to_path_buf(),
            dry_run_by_default: config.dry_run_by_default(),
        }
    }

    /// With a separate output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// With dry run as the default write mode
    #[inline]
    #[must_use]
    pub fn with_dry_run_by_default(mut self, dry_run: bool) -> Self {
        self.dry_run_by_default = dry_run;
        self
    }

    /// Directory that is read
    #[inline]
    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Directory that receives writes
    #[inline]
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Read the model tree under a shared lock
    ///
    /// # Errors
    /// Returns `ServiceError::Read` if the read fails
    pub fn read(&self) -> ServiceResult<Model> {
        let lock = lock_for(&self.model_dir);
        let _guard = lock.read();
        Ok(read_model(&self.model_dir)?)
    }

    /// Write an edited model to the output directory under an exclusive lock
    ///
    /// `dry_run` overrides the store default when given.
    ///
    /// # Errors
    /// Returns `ServiceError::Write` if the write fails
    pub fn write(&self, model: Model, dry_run: Option<bool>) -> ServiceResult<ChangeReport> {
        let options = WriteOptions {
            dry_run: dry_run.unwrap_or(self.dry_run_by_default),
        };
        self.write_to(model, &self.output_dir, options)
    }

    /// Write an edited model to an explicit directory under an exclusive lock
    ///
    /// # Errors
    /// Returns `ServiceError::Write` if the write fails
    pub fn write_to(&self, model: Model, directory: &Path, options: WriteOptions) -> ServiceResult<ChangeReport> {
        let lock = lock_for(directory);
        let _guard = lock.write();
        let report = write_model(model.input_model, &model.file_info, directory, options)?;
        tracing::info!(
            directory = %directory.display(),
            affected = report.affected().len(),
            dry_run = options.dry_run,
            "write finished"
        );
        Ok(report)
    }

    /// Read the model tree and dry-run writing it back unchanged
    ///
    /// A tree in sync with its own model reports every file as ignored.
    ///
    /// # Errors
    /// Returns `ServiceError::Read` or `ServiceError::Write` if either step fails
    pub fn check(&self) -> ServiceResult<ChangeReport> {
        let lock = lock_for(&self.model_dir);
        let _guard = lock.read();
        let report = check_model(&self.model_dir)?;
        if !report.is_clean() {
            tracing::warn!(
                directory = %self.model_dir.display(),
                affected = ?report.affected(),
                "model tree does not round-trip"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_directory_shares_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let a = lock_for(dir.path());
        let b = lock_for(&dir.path().join("."));
        assert!(Arc::ptr_eq(&a, &b));

        let other = tempfile::tempdir().unwrap();
        assert!(!Arc::ptr_eq(&a, &lock_for(other.path())));
    }

    #[test]
    fn directory_keeps_its_lock_once_created() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("out").join("nested");

        let before = lock_for(&target);
        std::fs::create_dir_all(&target).unwrap();
        let after = lock_for(&target);

        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(lock_key(&target), target.canonicalize().unwrap());
    }

    #[test]
    fn released_locks_leave_the_table() {
        let gone = tempfile::tempdir().unwrap();
        let kept = tempfile::tempdir().unwrap();
        let key = lock_key(gone.path());

        drop(lock_for(gone.path()));
        let _held = lock_for(kept.path());

        let locks = DIRECTORY_LOCKS.lock();
        assert!(!locks.contains_key(&key));
        assert!(locks.contains_key(&lock_key(kept.path())));
    }

    #[test]
    fn config_drives_directories() {
        let config = ServiceConfig::new()
            .with_model_dir("/srv/model")
            .with_dry_run_by_default(true);
        let store = ModelStore::from_config(&config);

        assert_eq!(store.model_dir(), Path::new("/srv/model"));
        assert_eq!(store.output_dir(), Path::new("/srv/model"));
        assert!(store.dry_run_by_default);
    }
}
