//! Entity identity inside list sections
//!
//! Several kinds of ids are used in the input model:
//! - `name`        : most sections
//! - `id`          : servers
//! - `region-name` : swift ring specifications
//! - `node_name`   : baremetal servers
//!
//! The first field present on the first entity of a list decides the key
//! field of that list.

use crate::error::KeyFieldError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt::{self, Display, Formatter};

/// Identifying field of the entities in a list section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyField {
    /// `name`
    #[serde(rename = "name")]
    Name,
    /// `id`, used by servers
    #[serde(rename = "id")]
    Id,
    /// `region-name`, used by swift ring specifications
    #[serde(rename = "region-name")]
    RegionName,
    /// `node_name`, used by baremetal servers
    #[serde(rename = "node_name")]
    NodeName,
}

impl KeyField {
    /// Detection order, highest priority first
    pub const PRIORITY: [KeyField; 4] = [
        KeyField::Name,
        KeyField::Id,
        KeyField::RegionName,
        KeyField::NodeName,
    ];

    /// Field name as it appears in the documents
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            KeyField::Name => "name",
            KeyField::Id => "id",
            KeyField::RegionName => "region-name",
            KeyField::NodeName => "node_name",
        }
    }

    /// Pick the key field of an entity
    ///
    /// # Errors
    /// - `KeyFieldError::NotAMapping` if the entity is not a map
    /// - `KeyFieldError::NoKeyField` if no recognized field is present
    pub fn identify(entity: &Value) -> Result<Self, KeyFieldError> {
        let map = entity.as_mapping().ok_or(KeyFieldError::NotAMapping)?;
        Self::PRIORITY
            .into_iter()
            .find(|field| map.contains_key(field.as_str()))
            .ok_or(KeyFieldError::NoKeyField)
    }

    /// Value of this field on an entity, if present
    #[inline]
    #[must_use]
    pub fn value_of(self, entity: &Value) -> Option<&Value> {
        entity.as_mapping()?.get(self.as_str())
    }

    /// Value of this field on an entity, or the reason it is unusable
    ///
    /// # Errors
    /// Returns error if the entity is not a map or lacks the field
    pub fn require(self, entity: &Value) -> Result<&Value, KeyFieldError> {
        entity
            .as_mapping()
            .ok_or(KeyFieldError::NotAMapping)?
            .get(self.as_str())
            .ok_or(KeyFieldError::MissingField(self.as_str()))
    }
}

impl Display for KeyField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
