//! In-place update operators shared by every backend.

use serde_json::{Map, Value};

use crate::path::{get_path_mut, set_path};
use crate::types::{DocId, ID_FIELD};

/// `$set` semantics: each dotted key replaces the value at that path.
pub fn apply_set(doc: &mut Value, update: &Map<String, Value>) {
    let Value::Object(map) = doc else {
        return;
    };
    for (path, value) in update {
        set_path(map, path, value.clone());
    }
}

/// Replaces the array element keyed by `id` in place, or appends `element`.
///
/// The stored element always carries `_id`. A missing or non-array value at
/// `array_path` becomes a one-element array.
pub fn upsert_element(doc: &mut Value, array_path: &str, id: &DocId, element: &Value) {
    let mut element = element.clone();
    if let Value::Object(fields) = &mut element {
        fields.insert(ID_FIELD.to_string(), Value::from(id));
    }

    if let Some(Value::Array(items)) = get_path_mut(doc, array_path) {
        match items.iter_mut().find(|item| has_id(item, id)) {
            Some(slot) => *slot = element,
            None => items.push(element),
        }
        return;
    }
    if let Value::Object(map) = doc {
        set_path(map, array_path, Value::Array(vec![element]));
    }
}

/// Removes every element keyed by `id`, returning whether any was removed.
pub fn remove_element(doc: &mut Value, array_path: &str, id: &DocId) -> bool {
    let Some(Value::Array(items)) = get_path_mut(doc, array_path) else {
        return false;
    };
    let before = items.len();
    items.retain(|item| !has_id(item, id));
    items.len() != before
}

fn has_id(item: &Value, id: &DocId) -> bool {
    item.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str())
}
