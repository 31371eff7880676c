//! Document storage abstraction with in-memory and SQLite backends.

mod filter;
mod index;
pub mod memory;
mod shared;
pub mod sqlite;
pub mod update;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::DocId;

pub use filter::Filter;
pub use index::IndexSpec;
pub use memory::MemoryStore;
pub use shared::SharedStore;
pub use sqlite::SqliteStore;

/// Storage failures.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite driver error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Body (de)serialization error.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    /// A write would give two documents the same unique index key.
    #[error("duplicate key in {collection} for index {index}")]
    DuplicateKey {
        /// Collection written.
        collection: String,
        /// Violated index, as named by [`IndexSpec::qualified_name`].
        index: String,
    },
    /// A call exceeded the configured timeout. The call itself keeps running
    /// on the blocking pool and may still complete.
    #[error("{op} timed out after {ms} ms; outcome unknown")]
    Timeout {
        /// Operation name.
        op: &'static str,
        /// Timeout that elapsed.
        ms: u64,
    },
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for storage calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// Synchronous document store. Implementations lock internally per call so
/// one instance can be shared across threads.
///
/// Bodies are JSON objects. Update methods return how many documents the
/// filter matched; zero is not an error. Writes that break a unique index
/// fail with [`PersistError::DuplicateKey`] and change nothing.
pub trait DocumentStore: Send + Sync {
    /// Inserts or replaces the document `id`.
    fn upsert(&self, collection: &str, id: &DocId, body: &Value) -> PersistResult<()>;

    /// Removes `id`, reporting whether it existed.
    fn remove(&self, collection: &str, id: &DocId) -> PersistResult<bool>;

    /// Loads one document.
    fn find_by_id(&self, collection: &str, id: &DocId) -> PersistResult<Option<Value>>;

    /// Loads every matching document in insertion order.
    fn find(&self, collection: &str, filter: &Filter) -> PersistResult<Vec<Value>>;

    /// Creates `index` on `collection` if it does not exist yet. Fails with
    /// [`PersistError::DuplicateKey`] when stored documents already violate a
    /// unique index.
    fn ensure_index(&self, collection: &str, index: &IndexSpec) -> PersistResult<()>;

    /// Removes every matching document.
    fn remove_where(&self, collection: &str, filter: &Filter) -> PersistResult<usize>;

    /// Applies `edit` to every matching document and writes the results back.
    fn modify_where(
        &self,
        collection: &str,
        filter: &Filter,
        edit: &mut dyn FnMut(&mut Value),
    ) -> PersistResult<usize>;

    /// Counts matching documents.
    fn count(&self, collection: &str, filter: &Filter) -> PersistResult<usize> {
        Ok(self.find(collection, filter)?.len())
    }

    /// Sets each dotted key of `fields` on every matching document.
    fn update_where(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &Map<String, Value>,
    ) -> PersistResult<usize> {
        self.modify_where(collection, filter, &mut |doc: &mut Value| {
            update::apply_set(doc, fields)
        })
    }

    /// Replaces the element of `array_path` whose `_id` is `element_id`, or
    /// appends `element` if there is none.
    fn upsert_array_element_by_id(
        &self,
        collection: &str,
        filter: &Filter,
        array_path: &str,
        element_id: &DocId,
        element: &Value,
    ) -> PersistResult<usize> {
        self.modify_where(collection, filter, &mut |doc: &mut Value| {
            update::upsert_element(doc, array_path, element_id, element)
        })
    }

    /// Drops the element of `array_path` whose `_id` is `element_id`.
    fn remove_array_element_by_id(
        &self,
        collection: &str,
        filter: &Filter,
        array_path: &str,
        element_id: &DocId,
    ) -> PersistResult<usize> {
        self.modify_where(collection, filter, &mut |doc: &mut Value| {
            update::remove_element(doc, array_path, element_id);
        })
    }
}
