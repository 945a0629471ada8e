//! Model snapshot types
//!
//! A read produces a [`Model`]: the merged [`InputModel`] plus the
//! [`FileInfo`] provenance needed to put every section back where it came
//! from. A write consumes an edited input model together with the original
//! file info and reports a [`FileChange`] per file.

use crate::key_field::KeyField;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Section present in every document, carrying the model format version
pub const PRODUCT_SECTION: &str = "product";

/// Section holding the cloud name in the primary document
pub const CLOUD_SECTION: &str = "cloud";

/// Vendor/plugin blob section that may be spread over several files
pub const PASS_THROUGH_SECTION: &str = "pass-through";

/// Merged sections, keyed by section name, in visit order
pub type InputModel = IndexMap<String, Value>;

/// Complete result of reading a model tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Cloud name (`cloud.name` of the primary document)
    pub name: String,
    /// Model format version (`product.version` of the primary document)
    pub version: Value,
    /// README texts keyed by extension (`"md"` for `README.md`)
    #[serde(default)]
    pub readme: BTreeMap<String, String>,
    /// Provenance collected at read time
    pub file_info: FileInfo,
    /// Merged sections
    #[serde(default)]
    pub input_model: InputModel,
    /// Non-fatal problems found during the read
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Where every section came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Absolute path of the primary document
    pub config_file: PathBuf,
    /// Model root directory
    pub directory: PathBuf,
    /// Every YAML file seen, relative to the root, primary document first
    pub files: Vec<String>,
    /// Files that contributed to each section, in visit order
    pub sections: IndexMap<String, Vec<String>>,
    /// Section descriptors of each file, in document order
    pub file_section_map: IndexMap<String, Vec<SectionRef>>,
    /// Modification time of the primary document
    pub mtime_millis: i64,
}

impl FileInfo {
    /// Files that contributed to a section
    #[inline]
    #[must_use]
    pub fn files_for(&self, section: &str) -> &[String] {
        self.sections.get(section).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the section was seen at read time
    #[inline]
    #[must_use]
    pub fn knows_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Whether the section lives in exactly one file
    #[inline]
    #[must_use]
    pub fn is_single_file(&self, section: &str) -> bool {
        self.files_for(section).len() == 1
    }

    /// All list descriptors of a section as `(file, key field, member ids)`
    pub fn array_refs<'a>(
        &'a self,
        section: &'a str,
    ) -> impl Iterator<Item = (&'a str, KeyField, &'a [Value])> + 'a {
        self.file_section_map.iter().flat_map(move |(file, refs)| {
            refs.iter().filter_map(move |section_ref| match section_ref {
                SectionRef::ArrayEntities {
                    name,
                    key_field,
                    member_ids,
                } if name == section => Some((file.as_str(), *key_field, member_ids.as_slice())),
                _ => None,
            })
        })
    }

    /// Key field recorded for a list section
    #[must_use]
    pub fn key_field_for(&self, section: &str) -> Option<KeyField> {
        self.array_refs(section).map(|(_, key_field, _)| key_field).next()
    }

    /// Whether every file holding entities of the section held exactly one
    ///
    /// Decides if entities added after the read get one file each or are
    /// grouped into a single new file. Files holding an empty list do not
    /// count either way.
    #[must_use]
    pub fn holds_one_entity_per_file(&self, section: &str) -> bool {
        let mut holders = self
            .array_refs(section)
            .filter(|(_, _, ids)| !ids.is_empty())
            .peekable();
        holders.peek().is_some() && holders.all(|(_, _, ids)| ids.len() == 1)
    }

    /// Whether a file was seen at read time but has nothing to write back
    ///
    /// That is a file that contributed no sections (empty, unreadable or
    /// invalid YAML) or one holding nothing but `product`.
    #[must_use]
    pub fn is_inert(&self, file: &str) -> bool {
        match self.file_section_map.get(file) {
            Some(refs) => refs.iter().all(|r| r.name() == PRODUCT_SECTION),
            None => self.files.iter().any(|f| f == file),
        }
    }
}

/// Descriptor of one section inside one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SectionRef {
    /// Primitive value, `product`, or single-file pass-through, written verbatim
    Scalar {
        /// Section name
        name: String,
    },
    /// Homogeneous entity list; values live in the input model
    #[serde(rename_all = "camelCase")]
    ArrayEntities {
        /// Section name
        name: String,
        /// Field identifying the entities of the section
        key_field: KeyField,
        /// Key values of the entities this file held, in file order
        member_ids: Vec<Value>,
    },
    /// Merged object written whole
    ObjectSection {
        /// Section name
        name: String,
    },
    /// Pass-through keys contributed by this file
    #[serde(rename_all = "camelCase")]
    PassThrough {
        /// `top.sub` keys owned by this file
        dotted_keys: Vec<String>,
    },
}

impl SectionRef {
    /// Scalar descriptor for a section
    #[inline]
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::Scalar { name: name.into() }
    }

    /// Section name this descriptor refers to
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name }
            | Self::ArrayEntities { name, .. }
            | Self::ObjectSection { name } => name,
            Self::PassThrough { .. } => PASS_THROUGH_SECTION,
        }
    }
}

/// Outcome of writing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// New content equals what is on disk; nothing written
    Ignored,
    /// File existed and its content differs
    Changed,
    /// File did not exist before
    Added,
    /// File existed but received no content
    Deleted,
}

/// Content and status of one file in a write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Document written, or that would be written in a dry run
    pub content: Option<Value>,
    /// What happened to the file
    pub status: FileStatus,
}

/// Per-file result of a write, keyed by path relative to the model root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeReport(IndexMap<String, FileChange>);

impl ChangeReport {
    /// Create empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a file
    pub fn record(&mut self, file: impl Into<String>, change: FileChange) {
        self.0.insert(file.into(), change);
    }

    /// Change recorded for a file
    #[inline]
    #[must_use]
    pub fn get(&self, file: &str) -> Option<&FileChange> {
        self.0.get(file)
    }

    /// Status recorded for a file
    #[inline]
    #[must_use]
    pub fn status(&self, file: &str) -> Option<FileStatus> {
        self.0.get(file).map(|change| change.status)
    }

    /// Files with the given status, in report order
    #[must_use]
    pub fn files_with(&self, status: FileStatus) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, change)| change.status == status)
            .map(|(file, _)| file.as_str())
            .collect()
    }

    /// Files whose status is anything but [`FileStatus::Ignored`]
    #[must_use]
    pub fn affected(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, change)| change.status != FileStatus::Ignored)
            .map(|(file, _)| file.as_str())
            .collect()
    }

    /// Whether the write left every file untouched
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.affected().is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileChange)> {
        self.0.iter().map(|(file, change)| (file.as_str(), change))
    }

    /// Number of files in the report
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the report is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
