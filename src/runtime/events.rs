//! Cascade progress events.

use crate::cascade::{CascadeOutcome, CascadeStep};
use crate::types::DocId;

/// Events broadcast while cascades run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeEvent {
    /// One storage write finished.
    StepApplied {
        /// Collection written.
        target_collection: String,
        /// Kind of write.
        step: CascadeStep,
        /// Documents matched; zero is a no-op.
        matched: usize,
    },
    /// One storage write failed; sibling steps still run.
    StepFailed {
        /// Collection written.
        target_collection: String,
        /// Kind of write.
        step: CascadeStep,
        /// Error text.
        message: String,
    },
    /// Every plan of one save or delete has been attempted.
    Finished {
        /// Collection of the triggering document.
        source_collection: String,
        /// Triggering document.
        source_id: DocId,
        /// Overall result.
        outcome: CascadeOutcome,
    },
}
