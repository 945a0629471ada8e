//! Pass-through provenance
//!
//! The `pass-through` section is a two-level map merged from every file
//! that carries one. Each file remembers the dotted keys it contributed:
//! `top.sub` for entries of a nested map, `top` for any other value.
//!
//! When the same top key is a map in one file and a plain value in another,
//! the nested keys win: the map is kept and the plain value loses its
//! provenance. When the same key appears twice, the file read last owns it.

use crate::document::{find_key, key_text};
use serde_yaml::{Mapping, Value};

/// Keys contributed, displaced and shadowed by merging one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Dotted keys this file now owns
    pub contributed: Vec<String>,
    /// Dotted keys previously owned by an earlier file and taken over
    pub displaced: Vec<String>,
    /// Human-readable shape conflicts
    pub conflicts: Vec<String>,
}

/// Dotted key of a nested entry
#[must_use]
pub fn dotted(top: &str, sub: &str) -> String {
    format!("{top}.{sub}")
}

/// Sub-keys of a value that is stored as nested entries
///
/// Only non-empty maps whose keys all have a text form are nested; anything
/// else is stored under its top key as a whole.
fn nested_keys(value: &Value) -> Option<Vec<String>> {
    let map = value.as_mapping().filter(|map| !map.is_empty())?;
    map.keys().map(key_text).collect()
}

/// Merge one file's pass-through map into the model's
pub fn merge(target: &mut Mapping, incoming: &Mapping) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (top_key, value) in incoming {
        let Some(top) = key_text(top_key) else {
            outcome
                .conflicts
                .push(format!("pass-through key {top_key:?} cannot be addressed and was skipped"));
            continue;
        };

        let existing_nested = target.get(top_key).map(nested_keys);
        match (existing_nested, nested_keys(value)) {
            (None, Some(subs)) => {
                target.insert(top_key.clone(), value.clone());
                outcome
                    .contributed
                    .extend(subs.iter().map(|sub| dotted(&top, sub)));
            }
            (None, None) => {
                target.insert(top_key.clone(), value.clone());
                outcome.contributed.push(top);
            }
            (Some(Some(existing_subs)), Some(subs)) => {
                if let (Some(Value::Mapping(into)), Some(from)) =
                    (target.get_mut(top_key), value.as_mapping())
                {
                    for (sub_key, sub_value) in from {
                        into.insert(sub_key.clone(), sub_value.clone());
                    }
                }
                for sub in subs {
                    let key = dotted(&top, &sub);
                    if existing_subs.contains(&sub) {
                        outcome.displaced.push(key.clone());
                    }
                    outcome.contributed.push(key);
                }
            }
            (Some(Some(_)), None) => {
                outcome.conflicts.push(format!(
                    "pass-through key '{top}' is shadowed by nested keys from another file"
                ));
            }
            (Some(None), Some(subs)) => {
                target.insert(top_key.clone(), value.clone());
                outcome.displaced.push(top.clone());
                outcome.conflicts.push(format!(
                    "pass-through key '{top}' replaced by nested keys from another file"
                ));
                outcome
                    .contributed
                    .extend(subs.iter().map(|sub| dotted(&top, sub)));
            }
            (Some(None), None) => {
                target.insert(top_key.clone(), value.clone());
                outcome.displaced.push(top.clone());
                outcome.contributed.push(top);
            }
        }
    }

    outcome
}

/// Where a dotted key lives in a pass-through map
enum Location {
    Nested { top: Value, sub: Value },
    Flat(Value),
}

/// Resolve a dotted key, trying every `.` as the split point before
/// treating the whole key as a top-level key
fn locate(source: &Mapping, key: &str) -> Option<Location> {
    for (idx, _) in key.match_indices('.') {
        let (top, sub) = (&key[..idx], &key[idx + 1..]);
        let Some(top_key) = find_key(source, top) else {
            continue;
        };
        if let Some(Value::Mapping(inner)) = source.get(&top_key) {
            if let Some(sub_key) = find_key(inner, sub) {
                return Some(Location::Nested { top: top_key, sub: sub_key });
            }
        }
    }
    find_key(source, key).map(Location::Flat)
}

/// Move the values of `dotted_keys` out of `source` into a new map
///
/// Nested maps emptied by the move are dropped from `source`.
pub fn take_keys(source: &mut Mapping, dotted_keys: &[String]) -> Mapping {
    let mut taken = Mapping::new();

    for key in dotted_keys {
        match locate(source, key) {
            Some(Location::Nested { top, sub }) => {
                let mut emptied = false;
                if let Some(Value::Mapping(inner)) = source.get_mut(&top) {
                    if let Some(value) = inner.remove(&sub) {
                        let slot = taken
                            .entry(top.clone())
                            .or_insert_with(|| Value::Mapping(Mapping::new()));
                        if let Value::Mapping(into) = slot {
                            into.insert(sub, value);
                        }
                    }
                    emptied = inner.is_empty();
                }
                if emptied {
                    source.remove(&top);
                }
            }
            Some(Location::Flat(top)) => {
                if let Some(value) = source.remove(&top) {
                    taken.insert(top, value);
                }
            }
            None => {}
        }
    }

    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn merge_records_dotted_and_flat_keys() {
        let mut target = Mapping::new();
        let outcome = merge(
            &mut target,
            &map("{global: {esx_cloud1: true, thirdparty_folder: /opt/x}, servers: [{id: s1}]}"),
        );
        assert_eq!(
            outcome.contributed,
            vec!["global.esx_cloud1", "global.thirdparty_folder", "servers"]
        );
        assert!(outcome.displaced.is_empty());
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn merge_combines_nested_maps_across_files() {
        let mut target = Mapping::new();
        merge(&mut target, &map("{global: {esx_cloud1: true}}"));
        let outcome = merge(&mut target, &map("{global: {esx_cloud2: true}}"));

        assert_eq!(outcome.contributed, vec!["global.esx_cloud2"]);
        assert_eq!(target, map("{global: {esx_cloud1: true, esx_cloud2: true}}"));
    }

    #[test]
    fn later_file_owns_repeated_key() {
        let mut target = Mapping::new();
        merge(&mut target, &map("{global: {esx_cloud1: true}}"));
        let outcome = merge(&mut target, &map("{global: {esx_cloud1: false}}"));

        assert_eq!(outcome.displaced, vec!["global.esx_cloud1"]);
        assert_eq!(target, map("{global: {esx_cloud1: false}}"));
    }

    #[test]
    fn nested_keys_win_over_flat_value_either_order() {
        let mut flat_first = Mapping::new();
        merge(&mut flat_first, &map("{global: disabled}"));
        let outcome = merge(&mut flat_first, &map("{global: {x: 1}}"));
        assert_eq!(outcome.displaced, vec!["global"]);
        assert_eq!(outcome.contributed, vec!["global.x"]);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(flat_first, map("{global: {x: 1}}"));

        let mut nested_first = Mapping::new();
        merge(&mut nested_first, &map("{global: {x: 1}}"));
        let outcome = merge(&mut nested_first, &map("{global: disabled}"));
        assert!(outcome.contributed.is_empty());
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(nested_first, map("{global: {x: 1}}"));
    }

    #[test]
    fn take_moves_owned_keys_and_prunes() {
        let mut source = map("{global: {a: 1, b: 2}, servers: [{id: s1}], extra: 3}");
        let taken = take_keys(
            &mut source,
            &["global.a".to_string(), "global.b".to_string(), "servers".to_string()],
        );

        assert_eq!(taken, map("{global: {a: 1, b: 2}, servers: [{id: s1}]}"));
        assert_eq!(source, map("{extra: 3}"));
    }

    #[test]
    fn take_leaves_unowned_nested_keys() {
        let mut source = map("{global: {a: 1, foo: bar}}");
        let taken = take_keys(&mut source, &["global.a".to_string()]);

        assert_eq!(taken, map("{global: {a: 1}}"));
        assert_eq!(source, map("{global: {foo: bar}}"));
    }

    #[test]
    fn take_handles_dots_inside_sub_keys() {
        let mut source = map("{hosts: {'10.0.0.1': up}}");
        let taken = take_keys(&mut source, &[dotted("hosts", "10.0.0.1")]);

        assert_eq!(taken, map("{hosts: {'10.0.0.1': up}}"));
        assert!(source.is_empty());
    }

    #[test]
    fn take_skips_reshaped_values() {
        // nested key recorded at read time, caller replaced the map with a string
        let mut source = map("{global: off}");
        let taken = take_keys(&mut source, &["global.a".to_string()]);

        assert!(taken.is_empty());
        assert_eq!(source, map("{global: off}"));
    }
}
