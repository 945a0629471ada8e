//! Single-file load / compare / write
//!
//! A file is only rewritten when its parsed content differs from the new
//! content, so comments and formatting of untouched files survive a write.

use crate::document::parse_document;
use crate::error::WriteError;
use crate::layout::resolve;
use crate::model::FileStatus;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// Write one document under the model root
///
/// Compares `content` with the parsed document already on disk (mapping key
/// order is not significant) and only writes when they differ. With
/// `dry_run` nothing is created or written but the status is the same.
///
/// # Errors
/// - `WriteError::Serialize` if the content cannot be rendered as YAML
/// - `WriteError::FileWriteFailure` if a directory or the file cannot be written
pub fn write_file(
    directory: &Path,
    relname: &str,
    content: &Value,
    dry_run: bool,
) -> Result<FileStatus, WriteError> {
    let path = resolve(directory, relname);

    if !dry_run {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| WriteError::io_error(parent, e))?;
        }
    }

    let existed = path.is_file();
    if existed && load_existing(&path).as_ref() == Some(content) {
        tracing::info!(file = %relname, "ignoring unchanged file");
        return Ok(FileStatus::Ignored);
    }

    let text = serde_yaml::to_string(content).map_err(|e| WriteError::Serialize {
        path: path.clone(),
        message: e.to_string(),
    })?;

    if dry_run {
        tracing::info!(file = %relname, existed, "would write file");
    } else {
        tracing::info!(file = %relname, existed, "writing file");
        fs::write(&path, text).map_err(|e| WriteError::io_error(&path, e))?;
    }

    Ok(if existed {
        FileStatus::Changed
    } else {
        FileStatus::Added
    })
}

/// Delete a file under the model root (no-op in a dry run)
///
/// # Errors
/// Returns `WriteError::FileWriteFailure` if the file cannot be removed
pub fn remove_file(directory: &Path, relname: &str, dry_run: bool) -> Result<(), WriteError> {
    let path = resolve(directory, relname);
    if dry_run {
        tracing::info!(file = %relname, "would delete obsolete file");
        return Ok(());
    }
    tracing::info!(file = %relname, "deleting obsolete file");
    fs::remove_file(&path).map_err(|e| WriteError::io_error(&path, e))
}

/// Parsed content of an existing file, `None` if it cannot be read or parsed
fn load_existing(path: &Path) -> Option<Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(file = %path.display(), error = %e, "cannot read existing file");
            return None;
        }
    };
    match parse_document(path, &text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "existing file is not valid YAML");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn added_then_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let content = doc("product: {version: 2}\nservers: [{id: s1}]\n");

        let status = write_file(dir.path(), "data/servers.yml", &content, false).unwrap();
        assert_eq!(status, FileStatus::Added);
        assert!(dir.path().join("data/servers.yml").is_file());

        let status = write_file(dir.path(), "data/servers.yml", &content, false).unwrap();
        assert_eq!(status, FileStatus::Ignored);
    }

    #[test]
    fn structural_equality_keeps_comments() {
        let dir = tempfile::tempdir().unwrap();
        let original = "# servers of rack 1\nservers:\n  - id: s1   # first\nproduct:\n  version: 2\n";
        std::fs::write(dir.path().join("servers.yml"), original).unwrap();

        let content = doc("product: {version: 2}\nservers: [{id: s1}]\n");
        let status = write_file(dir.path(), "servers.yml", &content, false).unwrap();

        assert_eq!(status, FileStatus::Ignored);
        let on_disk = std::fs::read_to_string(dir.path().join("servers.yml")).unwrap();
        assert_eq!(on_disk, original);
    }

    #[test]
    fn changed_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("servers.yml"), "servers: [{id: s1}]\n").unwrap();

        let content = doc("servers: [{id: s1}, {id: s2}]\n");
        let status = write_file(dir.path(), "servers.yml", &content, false).unwrap();

        assert_eq!(status, FileStatus::Changed);
        let text = std::fs::read_to_string(dir.path().join("servers.yml")).unwrap();
        assert_eq!(doc(&text), content);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let content = doc("networks: [{name: MGMT-NET}]\n");

        let status = write_file(dir.path(), "data/networks.yml", &content, true).unwrap();
        assert_eq!(status, FileStatus::Added);
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn unparseable_existing_file_counts_as_changed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yml"), "a: [\n").unwrap();

        let status = write_file(dir.path(), "bad.yml", &doc("a: 1\n"), true).unwrap();
        assert_eq!(status, FileStatus::Changed);
    }

    #[test]
    fn remove_respects_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.yml"), "a: 1\n").unwrap();

        remove_file(dir.path(), "old.yml", true).unwrap();
        assert!(dir.path().join("old.yml").exists());

        remove_file(dir.path(), "old.yml", false).unwrap();
        assert!(!dir.path().join("old.yml").exists());
    }
}
