//! Model tree layout
//!
//! File naming conventions of a model directory and a deterministic scan of
//! the YAML and README files below its root.

use serde_yaml::Value;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Primary document at the model root
pub const PRIMARY_DOCUMENT: &str = "cloudConfig.yml";

/// Subdirectory that receives files created by a write
pub const NEW_FILE_DIR: &str = "data";

/// Extension of model documents
pub const YAML_EXTENSION: &str = "yml";

const README_PREFIX: &str = "README";

/// Files found below a model root, sorted by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelTree {
    /// YAML documents, relative to the root, `/`-separated
    pub yaml_files: Vec<String>,
    /// README files as `(relative path, extension)`
    pub readmes: Vec<(String, String)>,
}

impl ModelTree {
    /// Scan a model root
    ///
    /// Directory entries are visited in file-name order so that repeated
    /// reads of the same tree assemble the same model.
    ///
    /// # Errors
    /// Returns the traversal error if any directory cannot be listed
    pub fn scan(root: &Path) -> Result<Self, walkdir::Error> {
        let mut tree = Self::default();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(rel_path) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relname = relative_name(rel_path);
            let file_name = entry.file_name().to_string_lossy();

            if is_yaml(&file_name) {
                tree.yaml_files.push(relname);
            } else if let Some(ext) = readme_extension(&file_name) {
                tree.readmes.push((relname, ext.to_string()));
            }
        }

        Ok(tree)
    }
}

/// Relative path rendered with `/` separators
#[must_use]
pub fn relative_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute path of a `/`-separated relative name under a root
#[must_use]
pub fn resolve(root: &Path, relname: &str) -> PathBuf {
    relname.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}

fn is_yaml(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext == YAML_EXTENSION)
}

/// Extension key of a README file: `md` for `README.md`, empty for `README`
fn readme_extension(file_name: &str) -> Option<&str> {
    let rest = file_name.strip_prefix(README_PREFIX)?;
    Some(rest.strip_prefix('.').unwrap_or(rest))
}

/// File-name stem of a section: hyphens become underscores
#[must_use]
pub fn section_stem(section: &str) -> String {
    section.replace('-', "_")
}

/// File for a section that did not exist at read time
#[must_use]
pub fn new_section_file(section: &str) -> String {
    format!("{NEW_FILE_DIR}/{}.{YAML_EXTENSION}", section_stem(section))
}

/// File named after a section and one of its entity keys
#[must_use]
pub fn entity_file(section: &str, key: &Value) -> String {
    format!(
        "{NEW_FILE_DIR}/{}_{}.{YAML_EXTENSION}",
        section_stem(section),
        key_slug(key)
    )
}

/// File named after a section with a random disambiguating suffix
#[must_use]
pub fn random_suffix_file(section: &str) -> String {
    format!(
        "{NEW_FILE_DIR}/{}_{}.{YAML_EXTENSION}",
        section_stem(section),
        random_hex()
    )
}

/// Same file name with a random suffix before the extension
#[must_use]
pub fn disambiguate(relname: &str) -> String {
    let stem = relname
        .strip_suffix(&format!(".{YAML_EXTENSION}"))
        .unwrap_or(relname);
    format!("{stem}_{}.{YAML_EXTENSION}", random_hex())
}

fn random_hex() -> String {
    hex::encode(rand::random::<[u8; 4]>())
}

/// Entity key rendered for use inside a file name
fn key_slug(key: &Value) -> String {
    let raw = match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    };
    raw.chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
