use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// View of `obj` without the given keys. Values are borrowed, not cloned,
/// and the input is left untouched.
pub fn remove_keys<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> BTreeMap<&'a str, &'a Value> {
    obj.iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}
