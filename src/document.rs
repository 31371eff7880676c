//! Persisted document types and their lifecycle hooks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cascade::{CascadeConfig, CascadeError, CascadePlan};
use crate::diff::{DiffError, Trackable};
use crate::record::{Field, FieldSet, Record, Snapshot};
use crate::registry::DocumentSchema;
use crate::types::DocId;

/// Identity and bookkeeping fields shared by every document.
///
/// Embed with `#[serde(flatten)]` and describe with [`Field::inline`] so the
/// fields sit at the top level of both the stored body and diff paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<DocId>,
    #[serde(rename = "_created", default)]
    created_ms: u64,
    #[serde(rename = "_modified", default)]
    modified_ms: u64,
    #[serde(skip)]
    stored: bool,
}

impl DocumentMeta {
    /// Document id, once assigned.
    pub fn id(&self) -> Option<&DocId> {
        self.id.as_ref()
    }

    /// Assigns an id ahead of the first save.
    pub fn set_id(&mut self, id: DocId) {
        self.id = Some(id);
    }

    /// Creation time in unix milliseconds.
    pub fn created_ms(&self) -> u64 {
        self.created_ms
    }

    /// Last save time in unix milliseconds.
    pub fn modified_ms(&self) -> u64 {
        self.modified_ms
    }

    /// Whether this instance was saved or loaded.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Flags the instance as persisted, or as new.
    pub fn mark_stored(&mut self, stored: bool) {
        self.stored = stored;
    }

    pub(crate) fn touch(&mut self, now_ms: u64) {
        if self.created_ms == 0 {
            self.created_ms = now_ms;
        }
        self.modified_ms = now_ms;
    }
}

impl Record for DocumentMeta {
    fn type_name(&self) -> &'static str {
        "DocumentMeta"
    }

    fn describe(&self, fields: &mut FieldSet) {
        fields
            .leaf(Field::new("id", "_id"), &self.id)
            .leaf(Field::new("created_ms", "_created"), &self.created_ms)
            .leaf(Field::new("modified_ms", "_modified"), &self.modified_ms)
            .transient(Field::named("stored"));
    }
}

/// Aggregated validation messages; nothing is written when this is raised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("validation failed ({})", .errors.join(", "))]
pub struct ValidationError {
    /// One message per failed rule.
    pub errors: Vec<String>,
}

/// Failure reported by a lifecycle hook.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Hook failure with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A type stored in one collection of a [`crate::runtime::Database`].
///
/// Only the identity accessors and the schema are required. Hooks default
/// to no-ops and `cascades` to none.
pub trait Document: Trackable + Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Registry key; must equal [`Record::type_name`].
    const TYPE_NAME: &'static str;

    /// Collection, references and indexes.
    fn schema() -> DocumentSchema;

    /// Identity fields.
    fn meta(&self) -> &DocumentMeta;

    /// Mutable identity fields.
    fn meta_mut(&mut self) -> &mut DocumentMeta;

    /// Messages for every failed rule; empty when valid.
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    /// Runs after validation, before the write.
    fn before_save(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after the write, before cascades are built.
    fn after_save(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs before the document is removed.
    fn before_delete(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after removal.
    fn after_delete(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs on every loaded document.
    fn after_find(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Cascades to run after a save to or delete from `collection`.
    ///
    /// Called while the diff baseline still holds the previously stored
    /// state, so [`Trackable::modified`] and [`Trackable::original_value`]
    /// describe the transition being persisted.
    fn cascades(&self, _collection: &str) -> Result<Vec<CascadeConfig>, CascadeError> {
        Ok(Vec::new())
    }
}

/// Builds plans for every cascade `doc` declares.
pub fn cascade_plans<T: Document>(doc: &T, collection: &str) -> Result<Vec<CascadePlan>, CascadeError> {
    let configs = doc.cascades(collection)?;
    if configs.is_empty() {
        return Ok(Vec::new());
    }
    let id = doc.meta().id().ok_or(CascadeError::MissingSourceId)?;
    let source = Snapshot::capture(doc);
    let zero = Snapshot::capture(&T::default());
    configs
        .into_iter()
        .map(|config| CascadePlan::prepare(config, &source, id, &zero))
        .collect()
}

/// Decodes a stored body as `T` with a fresh baseline and builds its plans.
pub(crate) fn plans_from_stored<T: Document>(
    body: &Value,
    collection: &str,
) -> Result<Vec<CascadePlan>, CascadeError> {
    let mut doc: T = serde_json::from_value(body.clone()).map_err(|source| CascadeError::Decode {
        type_name: T::TYPE_NAME,
        source,
    })?;
    prime_loaded(&mut doc)?;
    cascade_plans(&doc, collection)
}

/// Marks a just-decoded document stored and captures its baseline.
pub(crate) fn prime_loaded<T: Document>(doc: &mut T) -> Result<(), DiffError> {
    doc.meta_mut().mark_stored(true);
    attach_tracker(doc);
    if doc.diff_tracker().is_some() {
        doc.reset_tracking()?;
    }
    Ok(())
}

pub(crate) fn attach_tracker<T: Document>(doc: &mut T) {
    if let Some(tracker) = doc.diff_tracker_mut() {
        tracker.attach(T::TYPE_NAME);
    }
}
