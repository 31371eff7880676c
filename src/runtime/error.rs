use thiserror::Error;

use crate::diff::DiffError;
use crate::document::{HookError, ValidationError};
use crate::persist::PersistError;
use crate::registry::RegistryError;
use crate::types::DocId;

/// Failures of the save, delete and find pipeline.
///
/// Cascade failures never appear here; they are reported through the
/// [`crate::cascade::CascadeHandle`] and the event stream.
#[derive(Debug, Error)]
pub enum OdmError {
    /// The document failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A lifecycle hook refused the operation.
    #[error("{hook} failed: {source}")]
    Hook {
        /// Hook name.
        hook: &'static str,
        /// Hook error.
        #[source]
        source: HookError,
    },
    /// Change tracking misuse.
    #[error(transparent)]
    Diff(#[from] DiffError),
    /// Storage failure.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// Type not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Body (de)serialization failure.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    /// Delete of a document that is not stored.
    #[error("document {id} not found in {collection}")]
    DocumentNotFound {
        /// Collection searched.
        collection: String,
        /// Missing id.
        id: DocId,
    },
    /// The document claims to be stored but carries no id.
    #[error("stored document has no id")]
    MissingId,
}

impl OdmError {
    pub(crate) fn hook(hook: &'static str) -> impl FnOnce(HookError) -> Self {
        move |source| Self::Hook { hook, source }
    }
}
