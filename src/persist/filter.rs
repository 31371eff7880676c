use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{DocId, ID_FIELD};

/// Conjunction of equality clauses over dotted paths.
///
/// A path that crosses an array matches if any element matches, and a
/// scalar clause against an array matches if the array contains it. An
/// empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    clauses: BTreeMap<String, Value>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Single clause `path == value`.
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(path, value)
    }

    /// Matches the document whose `_id` is `id`.
    pub fn by_id(id: &DocId) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// Adds a clause, replacing any earlier one on the same path.
    pub fn and(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(path.into(), value.into());
        self
    }

    /// True when there are no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses in path order.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Evaluates the filter against a document body.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|(path, expected)| {
            let segments: Vec<&str> = path.split('.').collect();
            path_matches(doc, &segments, expected)
        })
    }
}

fn path_matches(cur: &Value, segments: &[&str], expected: &Value) -> bool {
    match segments.split_first() {
        None => {
            cur == expected || matches!(cur, Value::Array(items) if items.contains(expected))
        }
        Some((head, rest)) => match cur {
            Value::Object(map) => map
                .get(*head)
                .is_some_and(|next| path_matches(next, rest, expected)),
            Value::Array(items) => items
                .iter()
                .any(|item| path_matches(item, segments, expected)),
            _ => false,
        },
    }
}
