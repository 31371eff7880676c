//! Dotted-path helpers over JSON documents.

use serde_json::{Map, Value};

/// Returns true when `path` equals `prefix` or lies underneath it.
pub fn is_within(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Reads the value at a dotted path.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |cur, segment| cur.as_object()?.get(segment))
}

/// Writes `value` at a dotted path, creating intermediate objects.
///
/// An intermediate that exists but is not an object is replaced.
pub fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut cur = map;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            cur.insert(segment.to_string(), value);
            return;
        }
        let slot = cur
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        cur = next;
    }
}

/// Mutable variant of [`get_path`].
pub fn get_path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(doc, |cur, segment| cur.as_object_mut()?.get_mut(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        assert!(is_within("a.b.c", "a"));
        assert!(is_within("a.b.c", "a.b"));
        assert!(is_within("a.b.c", "a.b.c"));
        assert!(!is_within("a.bc", "a.b"));
        assert!(!is_within("a", "a.b"));
    }

    #[test]
    fn set_path_creates_and_replaces_intermediates() {
        let mut map = Map::new();
        map.insert("b".into(), json!(3));
        set_path(&mut map, "a.x", json!(1));
        set_path(&mut map, "a.y", json!(2));
        set_path(&mut map, "b.z", json!(4));
        assert_eq!(Value::Object(map), json!({"a": {"x": 1, "y": 2}, "b": {"z": 4}}));
    }

    #[test]
    fn get_path_walks_objects_only() {
        let doc = json!({"a": {"b": [1, 2]}});
        assert_eq!(get_path(&doc, "a.b"), Some(&json!([1, 2])));
        assert_eq!(get_path(&doc, "a.b.0"), None);
        assert_eq!(get_path(&doc, "missing"), None);
    }
}
