//! Shared identifiers and small enums.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable document identifier, a ULID in canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Generates a fresh, time-ordered identifier.
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Borrows the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<DocId> for Value {
    fn from(value: DocId) -> Self {
        Value::String(value.0)
    }
}

impl From<&DocId> for Value {
    fn from(value: &DocId) -> Self {
        Value::String(value.0.clone())
    }
}

/// Which of a field's two names is used when building paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Naming {
    /// The Rust field identifier, e.g. `parent_id`.
    #[default]
    Declared,
    /// The storage-facing name, e.g. `parentId`.
    External,
}

/// Arity of a denormalized relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arity {
    /// A single embedded copy.
    ToOne,
    /// An array of embedded copies keyed by source id.
    ToMany,
}

/// Field name under which every stored document keeps its id.
pub const ID_FIELD: &str = "_id";
