//! Structural change detection between record snapshots.

mod engine;
mod tracker;

use thiserror::Error;

use crate::record::SerializeError;

pub use engine::{compare, compare_snapshots};
pub use tracker::{DiffSession, DiffTracker, Trackable};

/// Errors raised by the diff engine and tracking sessions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// The two sides are different declared types.
    #[error("cannot compare records of different types {left} and {right}")]
    TypeMismatch {
        /// Left-hand type name.
        left: String,
        /// Right-hand type name.
        right: String,
    },
    /// A field was a record on one side and a plain value on the other.
    #[error("field {field} of {type_name} is not a record on both sides")]
    NotARecord {
        /// Owning type.
        type_name: String,
        /// Offending field.
        field: String,
    },
    /// The tracker was queried before being attached to its document.
    #[error("diff tracker used before it was attached to a document")]
    UninitializedTracker,
    /// A field named in a lookup does not exist on the type.
    #[error("unknown field {0}")]
    UnknownField(String),
    /// The baseline value at a path could not be serialized.
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Result alias for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;
