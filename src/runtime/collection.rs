use std::marker::PhantomData;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, warn};

use crate::cascade::{CascadeAction, CascadeFailure, CascadeHandle, CascadeReport, CascadeStep};
use crate::document::{Document, ValidationError, attach_tracker, cascade_plans, prime_loaded};
use crate::persist::{Filter, IndexSpec};
use crate::types::DocId;

use super::{Database, OdmError};

/// Typed view of one collection.
pub struct Collection<T> {
    name: String,
    indexes: Vec<IndexSpec>,
    db: Database,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            indexes: self.indexes.clone(),
            db: self.db.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub(crate) fn new(name: String, indexes: Vec<IndexSpec>, db: Database) -> Self {
        Self {
            name,
            indexes,
            db,
            _marker: PhantomData,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates, writes and then dispatches cascades for `doc`.
    ///
    /// Returns once the document itself is stored. The returned handle may
    /// be awaited for the cascade report or dropped.
    pub async fn save(&self, doc: &mut T) -> Result<CascadeHandle, OdmError> {
        attach_tracker(doc);
        let errors = doc.validate();
        if !errors.is_empty() {
            return Err(ValidationError { errors }.into());
        }
        doc.before_save().map_err(OdmError::hook("before_save"))?;

        let is_new = !doc.meta().is_stored();
        let id = match (doc.meta().id().cloned(), is_new) {
            (Some(id), _) => id,
            (None, true) => {
                let id = DocId::generate();
                doc.meta_mut().set_id(id.clone());
                id
            }
            (None, false) => return Err(OdmError::MissingId),
        };
        doc.meta_mut().touch(now_ms());

        let body = serde_json::to_value(&*doc)?;
        self.db
            .store()
            .ensure_indexes(&self.name, self.indexes.clone())
            .await?;
        self.db.store().upsert(&self.name, &id, body).await?;
        doc.after_save().map_err(OdmError::hook("after_save"))?;
        doc.meta_mut().mark_stored(true);
        debug!(collection = %self.name, %id, is_new, "saved document");

        let handle = self.dispatch(doc, &id, CascadeAction::Save);
        if doc.diff_tracker().is_some() {
            doc.reset_tracking()?;
        }
        Ok(handle)
    }

    /// Removes `doc` and dispatches its removal cascades.
    pub async fn delete_document(&self, doc: &mut T) -> Result<CascadeHandle, OdmError> {
        attach_tracker(doc);
        doc.before_delete().map_err(OdmError::hook("before_delete"))?;
        let id = doc.meta().id().cloned().ok_or(OdmError::MissingId)?;
        if !self.db.store().remove(&self.name, &id).await? {
            return Err(OdmError::DocumentNotFound {
                collection: self.name.clone(),
                id,
            });
        }
        debug!(collection = %self.name, %id, "deleted document");

        let handle = self.dispatch(doc, &id, CascadeAction::Delete);
        doc.meta_mut().mark_stored(false);
        doc.after_delete().map_err(OdmError::hook("after_delete"))?;
        Ok(handle)
    }

    /// Loads one document by id.
    pub async fn find_by_id(&self, id: &DocId) -> Result<Option<T>, OdmError> {
        match self.db.store().find_by_id(&self.name, id).await? {
            Some(body) => self.load(body).map(Some),
            None => Ok(None),
        }
    }

    /// Loads every matching document in insertion order.
    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, OdmError> {
        let bodies = self.db.store().find(&self.name, filter).await?;
        bodies.into_iter().map(|body| self.load(body)).collect()
    }

    /// Loads the first matching document.
    pub async fn find_one(&self, filter: &Filter) -> Result<Option<T>, OdmError> {
        let bodies = self.db.store().find(&self.name, filter).await?;
        bodies.into_iter().next().map(|body| self.load(body)).transpose()
    }

    /// Counts matching documents.
    pub async fn count(&self, filter: &Filter) -> Result<usize, OdmError> {
        Ok(self.db.store().count(&self.name, filter).await?)
    }

    /// Whether a document with `id` is stored.
    pub async fn exists(&self, id: &DocId) -> Result<bool, OdmError> {
        Ok(self.count(&Filter::by_id(id)).await? > 0)
    }

    /// Removes matching documents without running hooks or cascades.
    pub async fn delete_where(&self, filter: &Filter) -> Result<usize, OdmError> {
        let removed = self.db.store().remove_where(&self.name, filter).await?;
        debug!(collection = %self.name, removed, "deleted matching documents");
        Ok(removed)
    }

    fn load(&self, body: Value) -> Result<T, OdmError> {
        let mut doc: T = serde_json::from_value(body)?;
        prime_loaded(&mut doc)?;
        doc.after_find().map_err(OdmError::hook("after_find"))?;
        Ok(doc)
    }

    fn dispatch(&self, doc: &T, id: &DocId, action: CascadeAction) -> CascadeHandle {
        let (plans, failures) = match cascade_plans(doc, &self.name) {
            Ok(plans) => (plans, Vec::new()),
            Err(err) => {
                warn!(collection = %self.name, %id, error = %err, "cannot build cascades");
                let failure = CascadeFailure {
                    target_collection: self.name.clone(),
                    step: CascadeStep::Prepare,
                    message: err.to_string(),
                };
                (Vec::new(), vec![failure])
            }
        };
        if plans.is_empty() && failures.is_empty() {
            return CascadeHandle::ready(CascadeReport::default());
        }
        self.db
            .executor()
            .dispatch(&self.name, id, action, plans, failures)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
