use serde_json::{Map, Value};

use crate::path::get_path;
use crate::types::Naming;

use super::{Field, FieldSet, Record, SerializeError};

/// Captured value of one field.
#[derive(Debug, Clone)]
pub enum Node {
    /// Plain value with its `Debug` rendering.
    Leaf {
        /// Comparison text.
        text: String,
        /// Serialized value, or the serializer's message.
        value: Result<Value, String>,
    },
    /// Value compared by its `Display` rendering.
    Text {
        /// Comparison text.
        text: String,
        /// Serialized value, or the serializer's message.
        value: Result<Value, String>,
    },
    /// Nested record.
    Record(Snapshot),
    /// Missing optional record; yields the zero value of its type on demand.
    Absent(fn() -> Snapshot),
    /// Skipped entirely.
    Transient,
}

/// Owned deep copy of a record's described fields.
#[derive(Debug, Clone)]
pub struct Snapshot {
    type_name: &'static str,
    entries: Vec<(Field, Node)>,
}

impl Snapshot {
    /// Captures `record` as it is right now.
    pub fn capture<R: Record + ?Sized>(record: &R) -> Self {
        let mut fields = FieldSet::new();
        record.describe(&mut fields);
        Self {
            type_name: record.type_name(),
            entries: fields.into_entries(),
        }
    }

    /// Declared type of the captured record.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Captured fields in declaration order.
    pub fn entries(&self) -> &[(Field, Node)] {
        &self.entries
    }

    /// Top-level field names, with inlined records flattened.
    pub fn field_names(&self, naming: Naming) -> Vec<String> {
        let mut out = Vec::new();
        for (field, node) in &self.entries {
            match node {
                Node::Transient => {}
                Node::Record(inner) if field.inline => out.extend(inner.field_names(naming)),
                Node::Absent(zero) if field.inline => out.extend(zero().field_names(naming)),
                _ => out.push(field.name_for(naming).to_string()),
            }
        }
        out
    }

    /// Reads the value at a dotted path.
    ///
    /// Inlined records are searched transparently. A path that continues
    /// past a plain value descends into its serialized form. Absent records
    /// read as `null`. `Ok(None)` means the path names no field.
    pub fn lookup(&self, path: &str, naming: Naming) -> Result<Option<Value>, SerializeError> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        for (field, node) in &self.entries {
            if field.inline {
                if let Node::Record(inner) = node {
                    if let Some(found) = inner.lookup(path, naming)? {
                        return Ok(Some(found));
                    }
                }
                continue;
            }
            if field.name_for(naming) != head {
                continue;
            }
            return match (node, rest) {
                (Node::Transient, _) => Ok(None),
                (Node::Leaf { value, .. } | Node::Text { value, .. }, rest) => {
                    let value = serialized(field, value)?;
                    Ok(match rest {
                        None => Some(value.clone()),
                        Some(rest) => get_path(value, rest).cloned(),
                    })
                }
                (Node::Record(inner), None) => inner.to_value().map(Some),
                (Node::Record(inner), Some(rest)) => inner.lookup(rest, naming),
                (Node::Absent(_), _) => Ok(Some(Value::Null)),
            };
        }
        Ok(None)
    }

    /// Storage-shaped JSON object keyed by external names.
    pub fn to_value(&self) -> Result<Value, SerializeError> {
        let mut map = Map::new();
        self.write_into(&mut map)?;
        Ok(Value::Object(map))
    }

    fn write_into(&self, map: &mut Map<String, Value>) -> Result<(), SerializeError> {
        for (field, node) in &self.entries {
            match node {
                Node::Transient => {}
                Node::Leaf { value, .. } | Node::Text { value, .. } => {
                    map.insert(field.wire.to_string(), serialized(field, value)?.clone());
                }
                Node::Record(inner) if field.inline => inner.write_into(map)?,
                Node::Record(inner) => {
                    map.insert(field.wire.to_string(), inner.to_value()?);
                }
                Node::Absent(_) => {
                    map.insert(field.wire.to_string(), Value::Null);
                }
            }
        }
        Ok(())
    }
}

fn serialized<'a>(field: &Field, value: &'a Result<Value, String>) -> Result<&'a Value, SerializeError> {
    value.as_ref().map_err(|reason| SerializeError {
        field: field.wire.to_string(),
        reason: reason.clone(),
    })
}
