//! Explicit schema registry mapping document types to collections.
//!
//! Each document type is registered once at startup. Its schema (collection,
//! references, indexes), its detected capabilities and the type-erased
//! helpers used by nested cascades are cached together, so nothing is looked
//! up by reflection afterwards.

use hashbrown::HashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::cascade::{CascadeError, CascadePlan};
use crate::diff::Trackable;
use crate::document::{Document, plans_from_stored};
use crate::persist::IndexSpec;
use crate::record::Record;
use crate::types::Arity;

/// Registry lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No type registered under this name.
    #[error("unknown document type {0}")]
    UnknownType(String),
    /// No type registered for this collection.
    #[error("no document type registered for collection {0}")]
    UnknownCollection(String),
    /// Two types claim one collection.
    #[error("collection {collection} already belongs to {existing}")]
    DuplicateCollection {
        /// Contested collection.
        collection: String,
        /// Type registered first.
        existing: String,
    },
    /// A schema declared an empty collection name.
    #[error("document type {0} has an empty collection name")]
    EmptyCollectionName(String),
    /// A reference names a type that was never registered.
    #[error("{type_name}.{field} references unregistered type {target}")]
    DanglingReference {
        /// Declaring type.
        type_name: String,
        /// Reference field.
        field: String,
        /// Missing target type.
        target: String,
    },
}

/// Result alias for registry lookups.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Optional behaviours of a document type, detected at registration.
///
/// Validation and cascades are not listed: the pipeline always calls
/// [`Document::validate`] and [`Document::cascades`], whose defaults are
/// empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Carries a diff tracker.
    pub tracking: bool,
}

/// A field holding the id of a document of another type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceField {
    /// Field name, external naming.
    pub field: String,
    /// Referenced type.
    pub target_type: String,
    /// Single id or list of ids.
    pub arity: Arity,
    /// Set once the referenced type is known to be registered.
    pub exists: bool,
}

/// Static description of one document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
    collection: String,
    references: Vec<ReferenceField>,
    indexes: Vec<IndexSpec>,
    capabilities: Capabilities,
}

impl DocumentSchema {
    /// Schema for documents stored in `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            references: Vec::new(),
            indexes: Vec::new(),
            capabilities: Capabilities::default(),
        }
    }

    /// Declares a reference field.
    pub fn reference(mut self, field: impl Into<String>, target_type: impl Into<String>, arity: Arity) -> Self {
        self.references.push(ReferenceField {
            field: field.into(),
            target_type: target_type.into(),
            arity,
            exists: false,
        });
        self
    }

    /// Declares an index over dotted body paths, ensured before every save.
    pub fn index<I, S>(mut self, fields: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(IndexSpec::new(fields, unique));
        self
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Declared references.
    pub fn references(&self) -> &[ReferenceField] {
        &self.references
    }

    /// Declared indexes.
    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    /// Detected capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

type ZeroFn = fn() -> Box<dyn Record>;
type PlanFn = fn(&Value, &str) -> Result<Vec<CascadePlan>, CascadeError>;

struct TypeEntry {
    schema: DocumentSchema,
    zero: ZeroFn,
    plans: PlanFn,
}

/// Lookup table of registered document types.
#[derive(Default)]
pub struct SchemaRegistry {
    types: HashMap<&'static str, TypeEntry>,
    collections: HashMap<String, &'static str>,
}

impl SchemaRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its schema. Registering a type again replaces its
    /// entry.
    pub fn register<T: Document>(&mut self) -> RegistryResult<()> {
        let mut schema = T::schema();
        if schema.collection.is_empty() {
            return Err(RegistryError::EmptyCollectionName(T::TYPE_NAME.to_string()));
        }
        if let Some(existing) = self.collections.get(&schema.collection) {
            if *existing != T::TYPE_NAME {
                return Err(RegistryError::DuplicateCollection {
                    collection: schema.collection.clone(),
                    existing: existing.to_string(),
                });
            }
        }
        schema.capabilities.tracking = T::default().diff_tracker().is_some();

        if let Some(previous) = self.types.get(T::TYPE_NAME) {
            self.collections.remove(&previous.schema.collection);
        }
        debug!(type_name = T::TYPE_NAME, collection = %schema.collection, "registered document type");
        self.collections
            .insert(schema.collection.clone(), T::TYPE_NAME);
        self.types.insert(
            T::TYPE_NAME,
            TypeEntry {
                schema,
                zero: zero_value::<T>,
                plans: plans_from_stored::<T>,
            },
        );
        Ok(())
    }

    /// Marks every reference whose target type is registered. Fails on the
    /// first reference to an unknown type, after marking the rest.
    pub fn validate_references(&mut self) -> RegistryResult<()> {
        let known: Vec<&'static str> = self.types.keys().copied().collect();
        let mut dangling = None;
        for (type_name, entry) in self.types.iter_mut() {
            for reference in &mut entry.schema.references {
                reference.exists = known.contains(&reference.target_type.as_str());
                if !reference.exists && dangling.is_none() {
                    dangling = Some(RegistryError::DanglingReference {
                        type_name: type_name.to_string(),
                        field: reference.field.clone(),
                        target: reference.target_type.clone(),
                    });
                }
            }
        }
        match dangling {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Schema of a registered type.
    pub fn schema(&self, type_name: &str) -> RegistryResult<&DocumentSchema> {
        self.entry(type_name).map(|entry| &entry.schema)
    }

    /// Collection of a registered type.
    pub fn resolve_collection(&self, type_name: &str) -> RegistryResult<&str> {
        self.schema(type_name).map(DocumentSchema::collection)
    }

    /// Reference fields of a registered type.
    pub fn resolve_reference_fields(&self, type_name: &str) -> RegistryResult<&[ReferenceField]> {
        self.schema(type_name).map(DocumentSchema::references)
    }

    /// Zero value of a registered type.
    pub fn new_zero_value(&self, type_name: &str) -> RegistryResult<Box<dyn Record>> {
        self.entry(type_name).map(|entry| (entry.zero)())
    }

    /// Type registered for `collection`.
    pub fn type_for_collection(&self, collection: &str) -> RegistryResult<&'static str> {
        self.collections
            .get(collection)
            .copied()
            .ok_or_else(|| RegistryError::UnknownCollection(collection.to_string()))
    }

    /// Decodes a stored body of `collection` and builds its save cascades.
    pub(crate) fn plans_for_stored(
        &self,
        collection: &str,
        body: &Value,
    ) -> Result<Vec<CascadePlan>, CascadeError> {
        let type_name = self.type_for_collection(collection)?;
        let entry = self.entry(type_name)?;
        (entry.plans)(body, collection)
    }

    fn entry(&self, type_name: &str) -> RegistryResult<&TypeEntry> {
        self.types
            .get(type_name)
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))
    }
}

fn zero_value<T: Document>() -> Box<dyn Record> {
    Box::new(T::default())
}
