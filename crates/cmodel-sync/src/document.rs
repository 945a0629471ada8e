//! YAML document parsing
//!
//! Uses serde_yaml. A model file holds a single document whose top level is
//! a mapping of section names to values; an empty file is an empty document.

use crate::error::ReadError;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Parse file text into one document
///
/// Returns `Value::Null` for empty input.
///
/// # Errors
/// Returns `ReadError::InvalidYaml` if the text is not valid YAML or holds
/// more than one non-empty document
pub fn parse_document(path: &Path, text: &str) -> Result<Value, ReadError> {
    let mut documents = Vec::new();

    for doc in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(doc)
            .map_err(|e| ReadError::invalid_yaml(path, format!("YAML parse error: {e}")))?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    match documents.len() {
        0 => Ok(Value::Null),
        1 => Ok(documents.remove(0)),
        n => Err(ReadError::invalid_yaml(
            path,
            format!("expected a single document, found {n}"),
        )),
    }
}

/// Parse file text into its top-level sections
///
/// # Errors
/// Returns `ReadError::InvalidYaml` if the text is not valid YAML or its
/// top level is not a mapping
pub fn parse_sections(path: &Path, text: &str) -> Result<Mapping, ReadError> {
    match parse_document(path, text)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        _ => Err(ReadError::invalid_yaml(
            path,
            "top level of a model document must be a mapping",
        )),
    }
}

/// Get value at a dotted path (`product.version`)
#[must_use]
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        match current {
            Value::Mapping(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Text form of a mapping key, for keys used in dotted paths
#[must_use]
pub fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Find the mapping key whose text form is `text`
#[must_use]
pub fn find_key(map: &Mapping, text: &str) -> Option<Value> {
    if map.contains_key(text) {
        return Some(Value::from(text));
    }
    map.keys()
        .find(|key| key_text(key).as_deref() == Some(text))
        .cloned()
}

/// Whether a value carries nothing worth writing
#[must_use]
pub fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}
