use serde_json::{Map, Value};

use crate::path::set_path;
use crate::record::{Record, SerializeError, Snapshot};
use crate::types::Naming;

/// Builds the nested partial-update document for `paths`, reading each
/// value from `source` by external field name.
///
/// Paths sharing a prefix merge into one nested object. Paths that do not
/// resolve are written as `null`; a value that cannot be serialized fails
/// the whole map.
///
/// ```
/// # use denorm::record::{Field, FieldSet, Record};
/// # use denorm::cascade::build_nested_map;
/// # use serde_json::json;
/// struct Pair { a: String, b: String }
/// impl Record for Pair {
///     fn type_name(&self) -> &'static str { "Pair" }
///     fn describe(&self, fields: &mut FieldSet) {
///         fields.leaf(Field::named("a"), &self.a).leaf(Field::named("b"), &self.b);
///     }
/// }
///
/// let map = build_nested_map(&["a", "b"], &Pair { a: "x".into(), b: "y".into() })?;
/// assert_eq!(serde_json::Value::Object(map), json!({"a": "x", "b": "y"}));
/// # Ok::<(), denorm::record::SerializeError>(())
/// ```
pub fn build_nested_map<R, S>(paths: &[S], source: &R) -> Result<Map<String, Value>, SerializeError>
where
    R: Record + ?Sized,
    S: AsRef<str>,
{
    nested_map_from(&Snapshot::capture(source), paths)
}

/// [`build_nested_map`] over an already captured snapshot.
pub fn nested_map_from<S: AsRef<str>>(
    source: &Snapshot,
    paths: &[S],
) -> Result<Map<String, Value>, SerializeError> {
    let mut out = Map::new();
    for path in paths {
        let path = path.as_ref();
        let value = source.lookup(path, Naming::External)?.unwrap_or(Value::Null);
        set_path(&mut out, path, value);
    }
    Ok(out)
}
