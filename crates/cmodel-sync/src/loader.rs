//! Document loader and model assembler
//!
//! Reads the primary document, then every other `*.yml` file below the
//! model root, and folds each top-level section into the input model while
//! recording which file contributed it and in which shape.

use crate::document::{get_path, parse_document, parse_sections};
use crate::error::ReadError;
use crate::finalize::PendingSections;
use crate::key_field::KeyField;
use crate::layout::{resolve, ModelTree, PRIMARY_DOCUMENT};
use crate::model::{
    FileInfo, InputModel, Model, SectionRef, PASS_THROUGH_SECTION, PRODUCT_SECTION,
};
use crate::pass_through;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Read a model tree
///
/// # Errors
/// See [`ModelLoader::load`]
pub fn read_model(directory: impl AsRef<Path>) -> Result<Model, ReadError> {
    ModelLoader::new(directory.as_ref()).load()
}

/// Loader for one model root
#[derive(Debug, Clone)]
pub struct ModelLoader {
    root: PathBuf,
}

impl ModelLoader {
    /// Create loader for a model root
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Model root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the whole tree into a fresh [`Model`]
    ///
    /// Unreadable or invalid documents other than the primary one are
    /// skipped and listed in [`Model::errors`].
    ///
    /// # Errors
    /// - `ReadError::MissingOrUnreadablePrimaryDocument` if `cloudConfig.yml` cannot be read
    /// - `ReadError::InvalidYaml` if the primary document is not valid YAML
    /// - `ReadError::MissingRequiredField` if `product.version` or `cloud.name` is absent
    /// - `ReadError::UnidentifiableEntity` if a list entity has no key field
    /// - `ReadError::UnsupportedMultiFileSection` if an object section spans files
    /// - `ReadError::Walk` if the tree cannot be traversed
    pub fn load(&self) -> Result<Model, ReadError> {
        let config_file = self.root.join(PRIMARY_DOCUMENT);
        let text = fs::read_to_string(&config_file).map_err(|source| {
            ReadError::MissingOrUnreadablePrimaryDocument {
                path: config_file.clone(),
                source,
            }
        })?;

        let doc = parse_document(&config_file, &text)?;
        let version = get_path(&doc, "product.version")
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| ReadError::missing_field(&config_file, "product.version"))?;
        let name = get_path(&doc, "cloud.name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ReadError::missing_field(&config_file, "cloud.name"))?;
        let Value::Mapping(primary_sections) = doc else {
            return Err(ReadError::invalid_yaml(
                &config_file,
                "top level of a model document must be a mapping",
            ));
        };

        tracing::info!(root = %self.root.display(), cloud = %name, "reading model");

        let mut assembler = Assembler::new(FileInfo {
            mtime_millis: mtime_millis(&config_file),
            config_file,
            directory: self.root.clone(),
            files: vec![PRIMARY_DOCUMENT.to_string()],
            ..FileInfo::default()
        });
        assembler.add_document(PRIMARY_DOCUMENT, &primary_sections)?;

        let tree = ModelTree::scan(&self.root).map_err(|e| ReadError::Walk {
            path: self.root.clone(),
            message: e.to_string(),
        })?;

        for relname in tree.yaml_files {
            if relname == PRIMARY_DOCUMENT {
                continue;
            }
            assembler.file_info.files.push(relname.clone());

            match self.load_sections(&relname) {
                Ok(sections) => assembler.add_document(&relname, &sections)?,
                Err(e) => {
                    tracing::warn!(file = %relname, error = %e, "skipping invalid model file");
                    assembler.errors.push(e.to_string());
                }
            }
        }

        let mut readme = BTreeMap::new();
        for (relname, ext) in tree.readmes {
            if readme.contains_key(&ext) {
                tracing::debug!(file = %relname, "README for this extension already captured");
                continue;
            }
            match fs::read_to_string(resolve(&self.root, &relname)) {
                Ok(text) => {
                    readme.insert(ext, text);
                }
                Err(e) => {
                    tracing::warn!(file = %relname, error = %e, "cannot read README");
                    assembler.errors.push(format!("cannot read {relname}: {e}"));
                }
            }
        }

        let (file_info, input_model, errors) = assembler.finish()?;
        tracing::debug!(
            files = file_info.files.len(),
            sections = input_model.len(),
            "model assembled"
        );

        Ok(Model {
            name,
            version,
            readme,
            file_info,
            input_model,
            errors,
        })
    }

    fn load_sections(&self, relname: &str) -> Result<Mapping, ReadError> {
        let text = fs::read_to_string(resolve(&self.root, relname)).map_err(|source| {
            ReadError::UnreadableDocument {
                path: PathBuf::from(relname),
                source,
            }
        })?;
        parse_sections(Path::new(relname), &text)
    }
}

/// Shape of a top-level section value
enum Shape<'a> {
    Entities(&'a [Value]),
    PassThrough(&'a Mapping),
    Object,
    Scalar,
}

impl<'a> Shape<'a> {
    fn of(section: &str, value: &'a Value) -> Self {
        match value {
            Value::Sequence(items) if items.first().is_some_and(Value::is_mapping) => {
                Shape::Entities(items)
            }
            Value::Mapping(map) if section == PASS_THROUGH_SECTION => Shape::PassThrough(map),
            Value::Mapping(_) if section != PRODUCT_SECTION => Shape::Object,
            _ => Shape::Scalar,
        }
    }
}

/// Accumulates sections while the tree is walked
struct Assembler {
    file_info: FileInfo,
    input_model: InputModel,
    errors: Vec<String>,
    pending: PendingSections,
}

impl Assembler {
    fn new(file_info: FileInfo) -> Self {
        Self {
            file_info,
            input_model: InputModel::new(),
            errors: Vec::new(),
            pending: PendingSections::default(),
        }
    }

    fn add_document(&mut self, relname: &str, sections: &Mapping) -> Result<(), ReadError> {
        if sections.is_empty() {
            tracing::debug!(file = %relname, "empty document");
            return Ok(());
        }
        tracing::debug!(file = %relname, sections = sections.len(), "adding document");

        self.file_info
            .file_section_map
            .entry(relname.to_string())
            .or_default();

        let mut position = 0;
        for (key, value) in sections {
            let Some(section) = key.as_str() else {
                self.errors
                    .push(format!("{relname}: section key {key:?} is not a string, skipped"));
                continue;
            };

            self.file_info
                .sections
                .entry(section.to_string())
                .or_default()
                .push(relname.to_string());

            match Shape::of(section, value) {
                Shape::Entities(items) => self.add_entities(relname, section, items)?,
                Shape::PassThrough(map) => self.add_pass_through(relname, position, map),
                Shape::Object => {
                    self.pending.defer_object(section, relname, position);
                    self.input_model.insert(section.to_string(), value.clone());
                }
                Shape::Scalar if section == PRODUCT_SECTION => {
                    self.push_ref(relname, SectionRef::scalar(section));
                    self.input_model.insert(section.to_string(), value.clone());
                }
                Shape::Scalar => self.add_value(relname, position, section, value),
            }
            position += 1;
        }

        Ok(())
    }

    /// A primitive or a list without entities
    ///
    /// An empty list never replaces entities another file already gave the
    /// section; the finalizer decides how each file describes it.
    fn add_value(&mut self, relname: &str, position: usize, section: &str, value: &Value) {
        let empty_list = value.as_sequence().is_some_and(Vec::is_empty);
        self.pending.defer_value(section, relname, position, empty_list);

        match self.input_model.get(section) {
            Some(Value::Sequence(_)) if empty_list => {}
            _ => {
                self.input_model.insert(section.to_string(), value.clone());
            }
        }
    }

    fn add_entities(&mut self, relname: &str, section: &str, items: &[Value]) -> Result<(), ReadError> {
        let unidentifiable = |index, source| ReadError::UnidentifiableEntity {
            path: PathBuf::from(relname),
            section: section.to_string(),
            index,
            source,
        };

        let key_field = KeyField::identify(&items[0]).map_err(|e| unidentifiable(0, e))?;
        let member_ids = items
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                key_field
                    .require(entity)
                    .cloned()
                    .map_err(|e| unidentifiable(index, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.push_ref(
            relname,
            SectionRef::ArrayEntities {
                name: section.to_string(),
                key_field,
                member_ids,
            },
        );

        match self.input_model.get_mut(section) {
            Some(Value::Sequence(existing)) => existing.extend(items.iter().cloned()),
            _ => {
                self.input_model
                    .insert(section.to_string(), Value::Sequence(items.to_vec()));
            }
        }
        Ok(())
    }

    fn add_pass_through(&mut self, relname: &str, position: usize, incoming: &Mapping) {
        let slot = self
            .input_model
            .entry(PASS_THROUGH_SECTION.to_string())
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !slot.is_mapping() {
            self.errors.push(format!(
                "{relname}: pass-through map replaces a non-map pass-through value"
            ));
            *slot = Value::Mapping(Mapping::new());
        }

        let outcome = match slot {
            Value::Mapping(target) => pass_through::merge(target, incoming),
            _ => pass_through::MergeOutcome::default(),
        };

        for conflict in outcome.conflicts {
            tracing::warn!(file = %relname, "{conflict}");
            self.errors.push(format!("{relname}: {conflict}"));
        }
        self.pending.disown(&outcome.displaced);
        self.pending
            .defer_pass_through(relname, position, outcome.contributed);
    }

    fn push_ref(&mut self, relname: &str, section_ref: SectionRef) {
        self.file_info
            .file_section_map
            .entry(relname.to_string())
            .or_default()
            .push(section_ref);
    }

    fn finish(mut self) -> Result<(FileInfo, InputModel, Vec<String>), ReadError> {
        self.pending.finalize(&mut self.file_info)?;
        Ok((self.file_info, self.input_model, self.errors))
    }
}

fn mtime_millis(path: &Path) -> i64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
