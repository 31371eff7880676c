use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::types::DocId;

use super::{DocumentStore, Filter, IndexSpec, PersistError, PersistResult};

/// Async front for a [`DocumentStore`].
///
/// Every call runs on the blocking pool and is bounded by the configured
/// timeout. Cloning shares the underlying store.
///
/// A timeout only stops the wait: the blocking call cannot be cancelled and
/// may still apply its write afterwards, so [`PersistError::Timeout`] means
/// the outcome is unknown, not that nothing was written.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl SharedStore {
    /// Wraps `store` with a per-call timeout.
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self {
            inner: store,
            timeout,
        }
    }

    /// Underlying synchronous store.
    pub fn inner(&self) -> &Arc<dyn DocumentStore> {
        &self.inner
    }

    async fn call<T, F>(&self, op: &'static str, f: F) -> PersistResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> PersistResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(PersistError::Message(format!("{op} worker failed: {err}"))),
            Err(_) => Err(PersistError::Timeout {
                op,
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// See [`DocumentStore::upsert`].
    pub async fn upsert(&self, collection: &str, id: &DocId, body: Value) -> PersistResult<()> {
        let (collection, id) = (collection.to_string(), id.clone());
        self.call("upsert", move |s| s.upsert(&collection, &id, &body))
            .await
    }

    /// See [`DocumentStore::remove`].
    pub async fn remove(&self, collection: &str, id: &DocId) -> PersistResult<bool> {
        let (collection, id) = (collection.to_string(), id.clone());
        self.call("remove", move |s| s.remove(&collection, &id)).await
    }

    /// See [`DocumentStore::find_by_id`].
    pub async fn find_by_id(&self, collection: &str, id: &DocId) -> PersistResult<Option<Value>> {
        let (collection, id) = (collection.to_string(), id.clone());
        self.call("find_by_id", move |s| s.find_by_id(&collection, &id))
            .await
    }

    /// See [`DocumentStore::find`].
    pub async fn find(&self, collection: &str, filter: &Filter) -> PersistResult<Vec<Value>> {
        let (collection, filter) = (collection.to_string(), filter.clone());
        self.call("find", move |s| s.find(&collection, &filter)).await
    }

    /// See [`DocumentStore::count`].
    pub async fn count(&self, collection: &str, filter: &Filter) -> PersistResult<usize> {
        let (collection, filter) = (collection.to_string(), filter.clone());
        self.call("count", move |s| s.count(&collection, &filter)).await
    }

    /// Ensures every index in `indexes`, in order, in one blocking call.
    pub async fn ensure_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> PersistResult<()> {
        if indexes.is_empty() {
            return Ok(());
        }
        let collection = collection.to_string();
        self.call("ensure_indexes", move |s| {
            indexes
                .iter()
                .try_for_each(|index| s.ensure_index(&collection, index))
        })
        .await
    }

    /// See [`DocumentStore::remove_where`].
    pub async fn remove_where(&self, collection: &str, filter: &Filter) -> PersistResult<usize> {
        let (collection, filter) = (collection.to_string(), filter.clone());
        self.call("remove_where", move |s| s.remove_where(&collection, &filter))
            .await
    }

    /// See [`DocumentStore::update_where`].
    pub async fn update_where(
        &self,
        collection: &str,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> PersistResult<usize> {
        let (collection, filter) = (collection.to_string(), filter.clone());
        self.call("update_where", move |s| {
            s.update_where(&collection, &filter, &fields)
        })
        .await
    }

    /// See [`DocumentStore::upsert_array_element_by_id`].
    pub async fn upsert_array_element_by_id(
        &self,
        collection: &str,
        filter: &Filter,
        array_path: &str,
        element_id: &DocId,
        element: Value,
    ) -> PersistResult<usize> {
        let (collection, filter) = (collection.to_string(), filter.clone());
        let (array_path, element_id) = (array_path.to_string(), element_id.clone());
        self.call("upsert_array_element_by_id", move |s| {
            s.upsert_array_element_by_id(&collection, &filter, &array_path, &element_id, &element)
        })
        .await
    }

    /// See [`DocumentStore::remove_array_element_by_id`].
    pub async fn remove_array_element_by_id(
        &self,
        collection: &str,
        filter: &Filter,
        array_path: &str,
        element_id: &DocId,
    ) -> PersistResult<usize> {
        let (collection, filter) = (collection.to_string(), filter.clone());
        let (array_path, element_id) = (array_path.to_string(), element_id.clone());
        self.call("remove_array_element_by_id", move |s| {
            s.remove_array_element_by_id(&collection, &filter, &array_path, &element_id)
        })
        .await
    }
}
