//! Helpers for the untyped config tree that files and overlays merge into.

use serde_json::{Map, Value};

use crate::overlay::FieldPath;

/// Deep-merge `overlay` into `base`. Maps merge key by key; anything else
/// (scalars, sequences, null) replaces the base value.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Assign `value` at `path`, creating intermediate maps. A scalar sitting
/// where a map is needed is replaced.
pub fn set_path(tree: &mut Value, path: &FieldPath, value: Value) {
    let mut node = tree;
    for segment in path.segments() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            _ => return,
        };
    }
    *node = value;
}

/// Read the value at a dotted path of plain keys.
pub fn get_path<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| node.get(key))
}
