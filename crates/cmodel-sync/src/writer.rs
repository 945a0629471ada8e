//! Model writer
//!
//! Puts every section of an edited input model back into the file it was
//! read from, splitting list sections by the member ids recorded at read
//! time. Whatever no known file absorbs goes into new files under `data/`,
//! and YAML files that received no content are deleted.

use crate::document::is_vacant;
use crate::error::{SyncResult, WriteError};
use crate::file_io::{remove_file, write_file};
use crate::key_field::KeyField;
use crate::layout::{self, ModelTree};
use crate::loader::read_model;
use crate::model::{
    ChangeReport, FileChange, FileInfo, FileStatus, InputModel, Model, SectionRef,
    PASS_THROUGH_SECTION, PRODUCT_SECTION,
};
use crate::pass_through::take_keys;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::Path;

/// Options controlling a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Compute statuses and contents without touching the filesystem
    pub dry_run: bool,
}

impl WriteOptions {
    /// Options for a dry run
    #[inline]
    #[must_use]
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Write an edited input model back to a model tree
///
/// `file_info` must be the provenance returned by the read that produced
/// the model; the input model is consumed.
///
/// # Errors
/// Returns the first `WriteError` hit; files written before it stay written
pub fn write_model(
    input_model: InputModel,
    file_info: &FileInfo,
    directory: &Path,
    options: WriteOptions,
) -> Result<ChangeReport, WriteError> {
    tracing::info!(
        directory = %directory.display(),
        dry_run = options.dry_run,
        "writing model"
    );

    let mut writer = ModelWriter {
        directory,
        options,
        file_info,
        product: input_model.get(PRODUCT_SECTION).cloned(),
        remaining: input_model,
        report: ChangeReport::new(),
        claimed: HashSet::new(),
    };

    writer.write_known_files()?;
    writer.write_leftovers()?;
    writer.remove_obsolete()?;

    tracing::info!(
        files = writer.report.len(),
        affected = writer.report.affected().len(),
        "model written"
    );
    Ok(writer.report)
}

impl Model {
    /// Write this model's input model to `directory`
    ///
    /// # Errors
    /// See [`write_model`]
    pub fn write_to(self, directory: &Path, options: WriteOptions) -> Result<ChangeReport, WriteError> {
        write_model(self.input_model, &self.file_info, directory, options)
    }
}

/// Read a model tree and dry-run writing it back unchanged
///
/// A tree whose files all come back ignored is in sync with its own model.
///
/// # Errors
/// Returns `SyncError::Read` or `SyncError::Write` for whichever step failed
pub fn check_model(directory: &Path) -> SyncResult<ChangeReport> {
    let model = read_model(directory)?;
    let report = model.write_to(directory, WriteOptions::dry_run())?;
    if !report.is_clean() {
        tracing::debug!(
            directory = %directory.display(),
            affected = ?report.affected(),
            "tree does not write back unchanged"
        );
    }
    Ok(report)
}

struct ModelWriter<'a> {
    directory: &'a Path,
    options: WriteOptions,
    file_info: &'a FileInfo,
    product: Option<Value>,
    remaining: InputModel,
    report: ChangeReport,
    claimed: HashSet<String>,
}

impl ModelWriter<'_> {
    fn write_known_files(&mut self) -> Result<(), WriteError> {
        let file_info = self.file_info;

        for (file, refs) in &file_info.file_section_map {
            let mut content = Mapping::new();
            for section_ref in refs {
                if let Some((name, value)) = self.take_section(section_ref) {
                    content.insert(Value::from(name), value);
                }
            }

            if content.keys().any(|key| key.as_str() != Some(PRODUCT_SECTION)) {
                self.emit(file.clone(), Value::Mapping(content))?;
            } else {
                tracing::debug!(file = %file, "no content left for file");
            }
        }

        Ok(())
    }

    /// Content a known file gets for one of its descriptors
    fn take_section(&mut self, section_ref: &SectionRef) -> Option<(String, Value)> {
        match section_ref {
            SectionRef::Scalar { name } | SectionRef::ObjectSection { name } => {
                let value = if name == PRODUCT_SECTION {
                    self.product.clone()
                } else if self.file_info.key_field_for(name).is_some() {
                    tracing::warn!(section = %name, "whole-value descriptor on a list section, skipped");
                    None
                } else {
                    self.remaining.shift_remove(name)
                };
                value.map(|v| (name.clone(), v))
            }
            SectionRef::ArrayEntities {
                name,
                key_field,
                member_ids,
            } => {
                let value = if self.file_info.is_single_file(name) {
                    self.remaining.shift_remove(name)
                } else {
                    self.take_members(name, *key_field, member_ids)
                };
                value.map(|v| (name.clone(), v))
            }
            SectionRef::PassThrough { dotted_keys } => {
                let Some(Value::Mapping(source)) = self.remaining.get_mut(PASS_THROUGH_SECTION)
                else {
                    return None;
                };
                let taken = take_keys(source, dotted_keys);
                if source.is_empty() {
                    self.remaining.shift_remove(PASS_THROUGH_SECTION);
                }
                (!taken.is_empty())
                    .then(|| (PASS_THROUGH_SECTION.to_string(), Value::Mapping(taken)))
            }
        }
    }

    /// Move the entities listed for a file out of a split list section
    fn take_members(&mut self, section: &str, key_field: KeyField, member_ids: &[Value]) -> Option<Value> {
        let Some(Value::Sequence(items)) = self.remaining.get_mut(section) else {
            return None;
        };
        // the file held an empty list next to other files' entities
        if member_ids.is_empty() {
            return Some(Value::Sequence(Vec::new()));
        }

        let (mine, rest): (Vec<Value>, Vec<Value>) =
            std::mem::take(items).into_iter().partition(|item| {
                key_field
                    .value_of(item)
                    .is_some_and(|id| member_ids.contains(id))
            });
        *items = rest;

        (!mine.is_empty()).then_some(Value::Sequence(mine))
    }

    fn write_leftovers(&mut self) -> Result<(), WriteError> {
        let remaining = std::mem::take(&mut self.remaining);

        for (section, value) in remaining {
            if section == PRODUCT_SECTION || is_vacant(&value) {
                continue;
            }
            tracing::debug!(section = %section, "section has content no known file absorbed");

            if !self.file_info.knows_section(&section) {
                let file = if section == PASS_THROUGH_SECTION {
                    layout::random_suffix_file(&section)
                } else {
                    layout::new_section_file(&section)
                };
                self.emit_new(file, &section, value)?;
                continue;
            }

            match (self.file_info.key_field_for(&section), value) {
                (Some(key_field), Value::Sequence(items)) => {
                    self.write_leftover_entities(&section, key_field, items)?;
                }
                (_, value) => {
                    self.emit_new(layout::random_suffix_file(&section), &section, value)?;
                }
            }
        }

        Ok(())
    }

    fn write_leftover_entities(
        &mut self,
        section: &str,
        key_field: KeyField,
        items: Vec<Value>,
    ) -> Result<(), WriteError> {
        let file_for = |entity: &Value| {
            key_field.value_of(entity).map_or_else(
                || layout::random_suffix_file(section),
                |key| layout::entity_file(section, key),
            )
        };

        if self.file_info.holds_one_entity_per_file(section) {
            for entity in items {
                let file = file_for(&entity);
                self.emit_new(file, section, Value::Sequence(vec![entity]))?;
            }
        } else if let Some(first) = items.first() {
            let file = file_for(first);
            self.emit_new(file, section, Value::Sequence(items))?;
        }

        Ok(())
    }

    /// Write a new file holding `product` and one section
    fn emit_new(&mut self, file: String, section: &str, value: Value) -> Result<(), WriteError> {
        let mut content = Mapping::new();
        if let Some(product) = &self.product {
            content.insert(Value::from(PRODUCT_SECTION), product.clone());
        }
        content.insert(Value::from(section), value);

        let file = if self.claimed.contains(&file) {
            let renamed = layout::disambiguate(&file);
            tracing::debug!(file = %file, renamed = %renamed, "file name already used in this write");
            renamed
        } else {
            file
        };
        self.emit(file, Value::Mapping(content))
    }

    fn emit(&mut self, file: String, content: Value) -> Result<(), WriteError> {
        let status = write_file(self.directory, &file, &content, self.options.dry_run)?;
        self.claimed.insert(file.clone());
        self.report.record(
            file,
            FileChange {
                content: Some(content),
                status,
            },
        );
        Ok(())
    }

    /// Delete YAML files that received no content in this write
    ///
    /// Files that contributed nothing when the model was read are left alone.
    fn remove_obsolete(&mut self) -> Result<(), WriteError> {
        if !self.directory.is_dir() {
            tracing::debug!(directory = %self.directory.display(), "output directory absent");
            return Ok(());
        }

        let tree = ModelTree::scan(self.directory).map_err(|e| WriteError::Walk {
            path: self.directory.to_path_buf(),
            message: e.to_string(),
        })?;

        for file in tree.yaml_files {
            if self.claimed.contains(&file) || self.file_info.is_inert(&file) {
                continue;
            }
            remove_file(self.directory, &file, self.options.dry_run)?;
            self.report.record(
                file,
                FileChange {
                    content: None,
                    status: FileStatus::Deleted,
                },
            );
        }

        Ok(())
    }
}
