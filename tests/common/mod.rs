#![allow(dead_code)]

use std::sync::Arc;

use denorm::{
    cascade::{CascadeConfig, CascadeError},
    diff::{DiffTracker, Trackable},
    document::{Document, DocumentMeta, HookError},
    persist::{DocumentStore, Filter, IndexSpec, MemoryStore, PersistError, PersistResult},
    record::{Field, FieldSet, Record},
    registry::{DocumentSchema, SchemaRegistry},
    runtime::{Database, DatabaseConfig},
    types::{Arity, DocId, ID_FIELD},
    validate::validate_required,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Embedded copy of a sub-child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubChildRef {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    pub foo: String,
}

impl Record for SubChildRef {
    fn type_name(&self) -> &'static str {
        "SubChildRef"
    }

    fn describe(&self, fields: &mut FieldSet) {
        fields
            .leaf(Field::new("id", "_id"), &self.id)
            .leaf(Field::named("foo"), &self.foo);
    }
}

/// Embedded copy of a child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildRef {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    pub name: String,
    #[serde(rename = "subChild")]
    pub sub_child: SubChildRef,
}

impl Record for ChildRef {
    fn type_name(&self) -> &'static str {
        "ChildRef"
    }

    fn describe(&self, fields: &mut FieldSet) {
        fields
            .leaf(Field::new("id", "_id"), &self.id)
            .leaf(Field::named("name"), &self.name)
            .record(Field::new("sub_child", "subChild"), &self.sub_child);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Parent {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub bar: String,
    pub number: i64,
    #[serde(rename = "fooBar")]
    pub foo_bar: String,
    pub children: Vec<ChildRef>,
    pub child: ChildRef,
    #[serde(rename = "childProp")]
    pub child_prop: String,
    #[serde(skip)]
    pub tracker: DiffTracker,
}

impl Parent {
    pub fn named(bar: &str) -> Self {
        Self {
            bar: bar.to_string(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> DocId {
        self.meta.id().cloned().unwrap_or_else(|| DocId::from(""))
    }
}

impl Record for Parent {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn describe(&self, fields: &mut FieldSet) {
        fields
            .record(Field::inline("meta"), &self.meta)
            .leaf(Field::named("bar"), &self.bar)
            .leaf(Field::named("number"), &self.number)
            .leaf(Field::new("foo_bar", "fooBar"), &self.foo_bar)
            .leaf(Field::named("children"), &self.children)
            .record(Field::named("child"), &self.child)
            .leaf(Field::new("child_prop", "childProp"), &self.child_prop)
            .transient(Field::named("tracker"));
    }
}

impl Trackable for Parent {
    fn diff_tracker(&self) -> Option<&DiffTracker> {
        Some(&self.tracker)
    }

    fn diff_tracker_mut(&mut self) -> Option<&mut DiffTracker> {
        Some(&mut self.tracker)
    }
}

impl Document for Parent {
    const TYPE_NAME: &'static str = "Parent";

    fn schema() -> DocumentSchema {
        DocumentSchema::new("parents")
    }

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !validate_required(&self.bar) {
            errors.push("bar is required".to_string());
        }
        if self.number < 0 {
            errors.push("number must not be negative".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Child {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DocId>,
    pub name: String,
    #[serde(rename = "subChild")]
    pub sub_child: SubChildRef,
    #[serde(rename = "childProp")]
    pub child_prop: String,
    #[serde(skip)]
    pub tracker: DiffTracker,
}

impl Child {
    /// A child with an attached tracker, as the pipeline would leave it.
    pub fn tracked() -> Self {
        Self {
            tracker: DiffTracker::new(Self::TYPE_NAME),
            ..Self::default()
        }
    }

    pub fn id(&self) -> DocId {
        self.meta.id().cloned().unwrap_or_else(|| DocId::from(""))
    }
}

pub const CHILD_REF_FIELDS: [&str; 4] = ["_id", "name", "subChild.foo", "subChild._id"];

impl Record for Child {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn describe(&self, fields: &mut FieldSet) {
        fields
            .record(Field::inline("meta"), &self.meta)
            .leaf(Field::new("parent_id", "parentId"), &self.parent_id)
            .leaf(Field::named("name"), &self.name)
            .record(Field::new("sub_child", "subChild"), &self.sub_child)
            .leaf(Field::new("child_prop", "childProp"), &self.child_prop);
    }
}

impl Trackable for Child {
    fn diff_tracker(&self) -> Option<&DiffTracker> {
        Some(&self.tracker)
    }

    fn diff_tracker_mut(&mut self) -> Option<&mut DiffTracker> {
        Some(&mut self.tracker)
    }
}

impl Document for Child {
    const TYPE_NAME: &'static str = "Child";

    fn schema() -> DocumentSchema {
        DocumentSchema::new("children")
            .reference("parentId", "Parent", Arity::ToOne)
    }

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn cascades(&self, _collection: &str) -> Result<Vec<CascadeConfig>, CascadeError> {
        let current = Filter::eq(ID_FIELD, self.parent_id.clone());

        let mut prior = None;
        if self.modified("parent_id")? {
            if let Some(original) = self.original_value("parent_id")? {
                if !original.is_null() {
                    prior = Some(Filter::eq(ID_FIELD, original));
                }
            }
        }

        let single = CascadeConfig::to_one("parents", current.clone())
            .through("child")
            .with_fields(CHILD_REF_FIELDS)
            .with_prior(prior.clone());
        let multi = CascadeConfig::to_many("parents", "children", current.clone())
            .with_fields(CHILD_REF_FIELDS)
            .with_prior(prior.clone());
        let copy = CascadeConfig::to_one("parents", current)
            .with_fields(["childProp"])
            .with_prior(prior);
        Ok(vec![single, multi, copy])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubChild {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub foo: String,
    #[serde(rename = "childId", skip_serializing_if = "Option::is_none")]
    pub child_id: Option<DocId>,
}

impl SubChild {
    pub fn id(&self) -> DocId {
        self.meta.id().cloned().unwrap_or_else(|| DocId::from(""))
    }
}

impl Record for SubChild {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn describe(&self, fields: &mut FieldSet) {
        fields
            .record(Field::inline("meta"), &self.meta)
            .leaf(Field::named("foo"), &self.foo)
            .leaf(Field::new("child_id", "childId"), &self.child_id);
    }
}

impl Trackable for SubChild {}

impl Document for SubChild {
    const TYPE_NAME: &'static str = "SubChild";

    fn schema() -> DocumentSchema {
        DocumentSchema::new("subchildren")
            .reference("childId", "Child", Arity::ToOne)
    }

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn before_save(&mut self) -> Result<(), HookError> {
        if self.foo == "forbidden" {
            return Err(HookError::new("foo is forbidden"));
        }
        Ok(())
    }

    fn cascades(&self, _collection: &str) -> Result<Vec<CascadeConfig>, CascadeError> {
        let single = CascadeConfig::to_one("children", Filter::eq(ID_FIELD, self.child_id.clone()))
            .through("subChild")
            .with_fields(["_id", "foo"])
            .nested();
        Ok(vec![single])
    }
}

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register::<Parent>().expect("register parent");
    registry.register::<Child>().expect("register child");
    registry.register::<SubChild>().expect("register subchild");
    registry.validate_references().expect("references resolve");
    registry
}

pub fn memory_db() -> Database {
    memory_db_with(&DatabaseConfig::default())
}

pub fn memory_db_with(config: &DatabaseConfig) -> Database {
    Database::with_store(Arc::new(MemoryStore::new()), registry(), config)
}

/// Store whose writes into one collection always fail.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing: String,
}

impl DocumentStore for FlakyStore {
    fn upsert(&self, collection: &str, id: &DocId, body: &Value) -> PersistResult<()> {
        self.inner.upsert(collection, id, body)
    }

    fn remove(&self, collection: &str, id: &DocId) -> PersistResult<bool> {
        self.inner.remove(collection, id)
    }

    fn find_by_id(&self, collection: &str, id: &DocId) -> PersistResult<Option<Value>> {
        self.inner.find_by_id(collection, id)
    }

    fn find(&self, collection: &str, filter: &Filter) -> PersistResult<Vec<Value>> {
        self.inner.find(collection, filter)
    }

    fn ensure_index(&self, collection: &str, index: &IndexSpec) -> PersistResult<()> {
        self.inner.ensure_index(collection, index)
    }

    fn remove_where(&self, collection: &str, filter: &Filter) -> PersistResult<usize> {
        self.inner.remove_where(collection, filter)
    }

    fn modify_where(
        &self,
        collection: &str,
        filter: &Filter,
        edit: &mut dyn FnMut(&mut Value),
    ) -> PersistResult<usize> {
        if collection == self.failing {
            return Err(PersistError::Message(format!("{collection} is read-only")));
        }
        self.inner.modify_where(collection, filter, edit)
    }
}
