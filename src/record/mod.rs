//! Explicit per-type field descriptions used in place of runtime reflection.
//!
//! A persisted struct implements [`Record`] by listing its fields into a
//! [`FieldSet`]. The resulting [`Snapshot`] is an owned copy of the described
//! tree and is what the diff engine compares.
//!
//! ```
//! use denorm::record::{Field, FieldSet, Record};
//!
//! #[derive(Default)]
//! struct Address {
//!     city: String,
//! }
//!
//! impl Record for Address {
//!     fn type_name(&self) -> &'static str {
//!         "Address"
//!     }
//!     fn describe(&self, fields: &mut FieldSet) {
//!         fields.leaf(Field::named("city"), &self.city);
//!     }
//! }
//! ```

mod snapshot;

use std::fmt::{Debug, Display};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::Naming;

pub use snapshot::{Node, Snapshot};

/// One described field: its declared name, its storage name, and whether it
/// is inlined into its parent's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// Rust-level identifier.
    pub name: &'static str,
    /// Storage-facing name.
    pub wire: &'static str,
    /// Children alias the parent's namespace when set.
    pub inline: bool,
}

impl Field {
    /// A field whose storage name differs from its declared name.
    pub const fn new(name: &'static str, wire: &'static str) -> Self {
        Self {
            name,
            wire,
            inline: false,
        }
    }

    /// A field stored under its declared name.
    pub const fn named(name: &'static str) -> Self {
        Self::new(name, name)
    }

    /// An embedded record whose fields are flattened into the parent.
    pub const fn inline(name: &'static str) -> Self {
        Self {
            name,
            wire: name,
            inline: true,
        }
    }

    /// Name used for path construction under `naming`.
    pub fn name_for(&self, naming: Naming) -> &'static str {
        match naming {
            Naming::Declared => self.name,
            Naming::External => self.wire,
        }
    }
}

/// A described value that `serde_json` could not serialize.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("field {field} cannot be serialized: {reason}")]
pub struct SerializeError {
    /// Field name, as read.
    pub field: String,
    /// Serializer message.
    pub reason: String,
}

/// A structured value that can describe its own fields.
pub trait Record: Send + Sync {
    /// Declared type name; two records are comparable only if these match.
    fn type_name(&self) -> &'static str;

    /// Lists every field, in declaration order.
    fn describe(&self, fields: &mut FieldSet);
}

/// Collector passed to [`Record::describe`].
#[derive(Debug, Default)]
pub struct FieldSet {
    entries: Vec<(Field, Node)>,
}

impl FieldSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_entries(self) -> Vec<(Field, Node)> {
        self.entries
    }

    /// A plain value, compared by its `Debug` rendering.
    ///
    /// A value that fails to serialize is still compared; reading it back
    /// reports [`SerializeError`].
    pub fn leaf<T>(&mut self, field: Field, value: &T) -> &mut Self
    where
        T: Debug + Serialize + ?Sized,
    {
        let node = Node::Leaf {
            text: format!("{value:?}"),
            value: serialize(value),
        };
        self.entries.push((field, node));
        self
    }

    /// A value with its own textual form, compared by `Display` rather than
    /// structurally.
    pub fn text<T>(&mut self, field: Field, value: &T) -> &mut Self
    where
        T: Display + Serialize + ?Sized,
    {
        let node = Node::Text {
            text: value.to_string(),
            value: serialize(value),
        };
        self.entries.push((field, node));
        self
    }

    /// An always-present nested record.
    pub fn record<R>(&mut self, field: Field, value: &R) -> &mut Self
    where
        R: Record + ?Sized,
    {
        self.entries
            .push((field, Node::Record(Snapshot::capture(value))));
        self
    }

    /// A nested record that may be absent.
    pub fn optional<R>(&mut self, field: Field, value: Option<&R>) -> &mut Self
    where
        R: Record + Default,
    {
        let node = match value {
            Some(value) => Node::Record(Snapshot::capture(value)),
            None => Node::Absent(default_snapshot::<R>),
        };
        self.entries.push((field, node));
        self
    }

    /// A field that is never compared, extracted or stored.
    pub fn transient(&mut self, field: Field) -> &mut Self {
        self.entries.push((field, Node::Transient));
        self
    }
}

fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}

fn default_snapshot<R: Record + Default>() -> Snapshot {
    Snapshot::capture(&R::default())
}
