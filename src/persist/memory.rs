//! Process-local document store.

use std::sync::{Mutex, MutexGuard};

use hashbrown::{HashMap, HashSet};
use serde_json::Value;

use crate::types::DocId;

use super::{DocumentStore, Filter, IndexSpec, PersistError, PersistResult};

#[derive(Debug, Default)]
struct CollectionData {
    records: HashMap<DocId, Value>,
    order: Vec<DocId>,
    pos: HashMap<DocId, usize>,
    indexes: Vec<IndexSpec>,
}

impl CollectionData {
    fn put(&mut self, id: &DocId, body: Value) {
        if self.records.insert(id.clone(), body).is_none() {
            self.pos.insert(id.clone(), self.order.len());
            self.order.push(id.clone());
        }
    }

    fn take(&mut self, id: &DocId) -> bool {
        if self.records.remove(id).is_none() {
            return false;
        }
        if let Some(idx) = self.pos.remove(id) {
            self.order.remove(idx);
            for (offset, moved) in self.order[idx..].iter().enumerate() {
                self.pos.insert(moved.clone(), idx + offset);
            }
        }
        true
    }

    /// First unique index broken if `pending` bodies replaced or joined the
    /// stored ones.
    fn conflict(&self, pending: &[(DocId, Value)]) -> Option<&IndexSpec> {
        self.indexes.iter().filter(|index| index.is_unique()).find(|index| {
            let mut seen = HashSet::new();
            self.order
                .iter()
                .filter(|id| !pending.iter().any(|(pending_id, _)| pending_id == *id))
                .filter_map(|id| self.records.get(id))
                .chain(pending.iter().map(|(_, doc)| doc))
                .filter_map(|doc| index.key(doc))
                .any(|key| !seen.insert(key))
        })
    }

    fn matching(&self, filter: &Filter) -> Vec<DocId> {
        self.order
            .iter()
            .filter(|id| self.records.get(*id).is_some_and(|doc| filter.matches(doc)))
            .cloned()
            .collect()
    }
}

/// In-memory [`DocumentStore`] keeping insertion order per collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, CollectionData>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PersistResult<MutexGuard<'_, HashMap<String, CollectionData>>> {
        self.collections
            .lock()
            .map_err(|_| PersistError::Message("memory store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn upsert(&self, collection: &str, id: &DocId, body: &Value) -> PersistResult<()> {
        let mut guard = self.lock()?;
        let data = guard.entry(collection.to_string()).or_default();
        if let Some(index) = data.conflict(&[(id.clone(), body.clone())]) {
            return Err(duplicate(collection, index));
        }
        data.put(id, body.clone());
        Ok(())
    }

    fn ensure_index(&self, collection: &str, index: &IndexSpec) -> PersistResult<()> {
        let mut guard = self.lock()?;
        let data = guard.entry(collection.to_string()).or_default();
        if data.indexes.contains(index) {
            return Ok(());
        }
        data.indexes.push(index.clone());
        if let Some(conflict) = data.conflict(&[]) {
            let err = duplicate(collection, conflict);
            data.indexes.pop();
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, collection: &str, id: &DocId) -> PersistResult<bool> {
        Ok(self
            .lock()?
            .get_mut(collection)
            .is_some_and(|data| data.take(id)))
    }

    fn find_by_id(&self, collection: &str, id: &DocId) -> PersistResult<Option<Value>> {
        Ok(self
            .lock()?
            .get(collection)
            .and_then(|data| data.records.get(id).cloned()))
    }

    fn find(&self, collection: &str, filter: &Filter) -> PersistResult<Vec<Value>> {
        let guard = self.lock()?;
        let Some(data) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(data
            .matching(filter)
            .iter()
            .filter_map(|id| data.records.get(id).cloned())
            .collect())
    }

    fn remove_where(&self, collection: &str, filter: &Filter) -> PersistResult<usize> {
        let mut guard = self.lock()?;
        let Some(data) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let ids = data.matching(filter);
        for id in &ids {
            data.take(id);
        }
        Ok(ids.len())
    }

    fn modify_where(
        &self,
        collection: &str,
        filter: &Filter,
        edit: &mut dyn FnMut(&mut Value),
    ) -> PersistResult<usize> {
        let mut guard = self.lock()?;
        let Some(data) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let mut pending = Vec::new();
        for id in data.matching(filter) {
            if let Some(doc) = data.records.get(&id) {
                let mut doc = doc.clone();
                edit(&mut doc);
                pending.push((id, doc));
            }
        }
        if let Some(index) = data.conflict(&pending) {
            return Err(duplicate(collection, index));
        }
        let matched = pending.len();
        for (id, doc) in pending {
            data.records.insert(id, doc);
        }
        Ok(matched)
    }
}

fn duplicate(collection: &str, index: &IndexSpec) -> PersistError {
    PersistError::DuplicateKey {
        collection: collection.to_string(),
        index: index.qualified_name(collection),
    }
}
