use serde_json::Value;

use crate::path::is_within;
use crate::record::{Record, Snapshot};
use crate::types::Naming;

use super::{DiffError, DiffResult, compare_snapshots};

/// Baseline holder attached to exactly one document instance.
///
/// A default tracker is unattached and refuses every query with
/// [`DiffError::UninitializedTracker`]; the pipeline attaches it on save and
/// load.
#[derive(Debug, Clone, Default)]
pub struct DiffTracker {
    owner: Option<&'static str>,
    original: Option<Snapshot>,
}

impl DiffTracker {
    /// Creates a tracker attached to documents of type `owner`.
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner: Some(owner),
            original: None,
        }
    }

    /// Binds the tracker to `owner`. Rebinding to another type drops the
    /// baseline.
    pub fn attach(&mut self, owner: &'static str) {
        if self.owner != Some(owner) {
            self.original = None;
        }
        self.owner = Some(owner);
    }

    /// Whether [`attach`](Self::attach) has run.
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    /// Whether a baseline is captured.
    pub fn has_original(&self) -> bool {
        self.original.is_some()
    }

    /// Replaces the baseline with an already captured snapshot.
    pub fn set_baseline(&mut self, snapshot: Snapshot) -> DiffResult<()> {
        self.check_owner(snapshot.type_name())?;
        self.original = Some(snapshot);
        Ok(())
    }

    /// Captures a deep copy of `value` as the baseline.
    pub fn set_original<R: Record + ?Sized>(&mut self, value: &R) -> DiffResult<()> {
        self.set_baseline(Snapshot::capture(value))
    }

    /// Drops the baseline; the document reads as new again.
    pub fn clear(&mut self) {
        self.original = None;
    }

    /// Diffs `current` against the baseline. With no baseline the result is
    /// `(true, [])`.
    pub fn compare<R: Record + ?Sized>(
        &self,
        current: &R,
        naming: Naming,
    ) -> DiffResult<(bool, Vec<String>)> {
        self.check_owner(current.type_name())?;
        let Some(original) = &self.original else {
            return Ok((true, Vec::new()));
        };
        let changed = compare_snapshots(original, &Snapshot::capture(current), naming)?;
        Ok((false, changed))
    }

    /// Runs one comparison and keeps its result for path queries.
    pub fn new_session<R: Record + ?Sized>(
        &self,
        current: &R,
        naming: Naming,
    ) -> DiffResult<DiffSession> {
        let (is_new, changed) = self.compare(current, naming)?;
        Ok(DiffSession { is_new, changed })
    }

    /// Whether `path`, or anything beneath it, differs from the baseline.
    pub fn modified<R: Record + ?Sized>(&self, current: &R, path: &str) -> DiffResult<bool> {
        Ok(self.new_session(current, Naming::Declared)?.modified(path))
    }

    /// Baseline value at a declared-name path, `None` without a baseline.
    pub fn original_value(&self, path: &str) -> DiffResult<Option<Value>> {
        self.original_value_by(path, Naming::Declared)
    }

    /// [`original_value`](Self::original_value) with a choice of naming.
    pub fn original_value_by(&self, path: &str, naming: Naming) -> DiffResult<Option<Value>> {
        if self.owner.is_none() {
            return Err(DiffError::UninitializedTracker);
        }
        let Some(original) = &self.original else {
            return Ok(None);
        };
        original
            .lookup(path, naming)?
            .map(Some)
            .ok_or_else(|| DiffError::UnknownField(path.to_string()))
    }

    fn check_owner(&self, type_name: &'static str) -> DiffResult<()> {
        match self.owner {
            None => Err(DiffError::UninitializedTracker),
            Some(owner) if owner != type_name => Err(DiffError::TypeMismatch {
                left: owner.to_string(),
                right: type_name.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}

/// Result of one comparison against the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSession {
    is_new: bool,
    changed: Vec<String>,
}

impl DiffSession {
    /// True when no baseline existed.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Changed leaf paths in field order.
    pub fn changed(&self) -> &[String] {
        &self.changed
    }

    /// True if new, or if `path` equals or is a dotted parent of a changed
    /// path.
    pub fn modified(&self, path: &str) -> bool {
        self.is_new || self.changed.iter().any(|changed| is_within(changed, path))
    }
}

/// A record that owns a [`DiffTracker`].
pub trait Trackable: Record {
    /// The attached tracker, if the type tracks changes.
    fn diff_tracker(&self) -> Option<&DiffTracker> {
        None
    }

    /// Mutable access to the tracker.
    fn diff_tracker_mut(&mut self) -> Option<&mut DiffTracker> {
        None
    }

    /// Captures the current state as the new baseline.
    fn reset_tracking(&mut self) -> DiffResult<()>
    where
        Self: Sized,
    {
        let snapshot = Snapshot::capture(&*self);
        self.diff_tracker_mut()
            .ok_or(DiffError::UninitializedTracker)?
            .set_baseline(snapshot)
    }

    /// Compares the current state against the baseline.
    fn diff_session(&self, naming: Naming) -> DiffResult<DiffSession>
    where
        Self: Sized,
    {
        self.diff_tracker()
            .ok_or(DiffError::UninitializedTracker)?
            .new_session(self, naming)
    }

    /// See [`DiffSession::modified`].
    fn modified(&self, path: &str) -> DiffResult<bool>
    where
        Self: Sized,
    {
        Ok(self.diff_session(Naming::Declared)?.modified(path))
    }

    /// See [`DiffTracker::original_value`].
    fn original_value(&self, path: &str) -> DiffResult<Option<Value>> {
        self.diff_tracker()
            .ok_or(DiffError::UninitializedTracker)?
            .original_value(path)
    }
}
