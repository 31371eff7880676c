//! Propagation of denormalized copies into related documents.
//!
//! A document declares [`CascadeConfig`]s for each save or delete. Each
//! config is turned into a [`CascadePlan`] against the document's current
//! state and handed to the [`CascadeExecutor`], which applies the plans on a
//! background task.

mod config;
mod executor;
mod extract;

use thiserror::Error;

use crate::diff::DiffError;
use crate::persist::PersistError;
use crate::record::SerializeError;
use crate::registry::RegistryError;

pub use config::{CascadeConfig, CascadePlan};
pub use executor::{
    CascadeAction, CascadeExecutor, CascadeFailure, CascadeHandle, CascadeOutcome, CascadeReport,
    CascadeStep,
};
pub use extract::{build_nested_map, nested_map_from};

/// Errors raised while building or running cascades.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Change detection failed while building configs.
    #[error(transparent)]
    Diff(#[from] DiffError),
    /// A type or collection was not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A storage call failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// A copied source field could not be serialized.
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    /// A stored body did not decode into its registered type.
    #[error("cannot decode stored {type_name}: {source}")]
    Decode {
        /// Registered type.
        type_name: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A config is not executable as written.
    #[error("invalid cascade into {target}: {reason}")]
    InvalidConfig {
        /// Target collection.
        target: String,
        /// What is wrong.
        reason: &'static str,
    },
    /// The source document has no id to key embedded copies by.
    #[error("cascade source has no id")]
    MissingSourceId,
    /// The background task panicked or was cancelled.
    #[error("cascade task failed: {0}")]
    Join(String),
}
