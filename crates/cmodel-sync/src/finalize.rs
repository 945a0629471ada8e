//! Section map finalizer
//!
//! Most sections can only be described once the whole tree has been read.
//! An object or a plain value is legal only if a single file holds it, an
//! empty list joins the entity list other files hold for the section, and
//! pass-through needs per-file key lists only when it is split. The loader
//! defers these here with their position in the document, and
//! [`PendingSections::finalize`] places the resulting descriptors.

use crate::error::ReadError;
use crate::model::{FileInfo, SectionRef, PASS_THROUGH_SECTION};
use indexmap::IndexMap;

/// File and position of a deferred section
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    file: String,
    position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ValuePlacement {
    placement: Placement,
    empty_list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PassThroughPlacement {
    placement: Placement,
    dotted_keys: Vec<String>,
}

/// Sections whose descriptors are decided after the walk
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingSections {
    objects: IndexMap<String, Vec<Placement>>,
    values: IndexMap<String, Vec<ValuePlacement>>,
    pass_through: Vec<PassThroughPlacement>,
}

impl PendingSections {
    /// Defer a merged-object section
    pub(crate) fn defer_object(&mut self, section: &str, file: &str, position: usize) {
        self.objects
            .entry(section.to_string())
            .or_default()
            .push(Placement {
                file: file.to_string(),
                position,
            });
    }

    /// Defer a plain value section: a primitive, a scalar list or an empty list
    pub(crate) fn defer_value(&mut self, section: &str, file: &str, position: usize, empty_list: bool) {
        self.values
            .entry(section.to_string())
            .or_default()
            .push(ValuePlacement {
                placement: Placement {
                    file: file.to_string(),
                    position,
                },
                empty_list,
            });
    }

    /// Defer a file's pass-through contribution
    pub(crate) fn defer_pass_through(&mut self, file: &str, position: usize, dotted_keys: Vec<String>) {
        self.pass_through.push(PassThroughPlacement {
            placement: Placement {
                file: file.to_string(),
                position,
            },
            dotted_keys,
        });
    }

    /// Remove keys taken over by a later file from earlier contributions
    pub(crate) fn disown(&mut self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        for earlier in &mut self.pass_through {
            earlier.dotted_keys.retain(|key| !keys.contains(key));
        }
    }

    /// Insert the deferred descriptors into each file's section list
    ///
    /// # Errors
    /// Returns `ReadError::UnsupportedMultiFileSection` if a merged object
    /// other than pass-through, or a plain value, shares its section with
    /// another file. Empty lists next to entity lists are the exception.
    pub(crate) fn finalize(self, file_info: &mut FileInfo) -> Result<(), ReadError> {
        let mut inserts: Vec<(Placement, SectionRef)> = Vec::new();

        for (section, mut placements) in self.objects {
            let holders = file_info.files_for(&section);
            if placements.len() > 1 || holders.len() > 1 {
                let files = if holders.len() > 1 {
                    holders.to_vec()
                } else {
                    placements.into_iter().map(|p| p.file).collect()
                };
                return Err(ReadError::UnsupportedMultiFileSection { section, files });
            }
            if let Some(placement) = placements.pop() {
                inserts.push((placement, SectionRef::ObjectSection { name: section }));
            }
        }

        for (section, placements) in self.values {
            let holders = file_info.files_for(&section);
            if placements.len() <= 1 && holders.len() <= 1 {
                for value in placements {
                    inserts.push((value.placement, SectionRef::scalar(section.as_str())));
                }
                continue;
            }

            match file_info.key_field_for(&section) {
                Some(key_field) if placements.iter().all(|value| value.empty_list) => {
                    tracing::debug!(
                        section = %section,
                        files = placements.len(),
                        "empty lists join an entity section"
                    );
                    for value in placements {
                        inserts.push((
                            value.placement,
                            SectionRef::ArrayEntities {
                                name: section.clone(),
                                key_field,
                                member_ids: Vec::new(),
                            },
                        ));
                    }
                }
                _ => {
                    let files = if holders.len() > 1 {
                        holders.to_vec()
                    } else {
                        placements.into_iter().map(|value| value.placement.file).collect()
                    };
                    return Err(ReadError::UnsupportedMultiFileSection { section, files });
                }
            }
        }

        if self.pass_through.len() == 1 {
            let only = self.pass_through.into_iter().next();
            if let Some(only) = only {
                tracing::debug!(file = %only.placement.file, "pass-through held by a single file");
                inserts.push((only.placement, SectionRef::scalar(PASS_THROUGH_SECTION)));
            }
        } else {
            for split in self.pass_through {
                inserts.push((
                    split.placement,
                    SectionRef::PassThrough {
                        dotted_keys: split.dotted_keys,
                    },
                ));
            }
        }

        // Ascending positions keep every earlier section of a file in place
        inserts.sort_by_key(|(placement, _)| placement.position);
        for (placement, section_ref) in inserts {
            let refs = file_info
                .file_section_map
                .entry(placement.file)
                .or_default();
            let at = placement.position.min(refs.len());
            refs.insert(at, section_ref);
        }

        Ok(())
    }
}
