use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::persist::{PersistResult, SharedStore};
use crate::registry::SchemaRegistry;
use crate::runtime::events::CascadeEvent;
use crate::types::{Arity, DocId};

use super::{CascadeError, CascadePlan};

/// What triggered a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeAction {
    /// Source was written; refresh copies.
    Save,
    /// Source was removed; clear copies.
    Delete,
}

/// Kind of work a failure or event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    /// Building plans from the source document.
    Prepare,
    /// Removing the copy from previously related targets.
    RemovePrior,
    /// Writing the copy into current targets.
    Write,
    /// Clearing the copy after the source was deleted.
    Remove,
    /// Re-running the cascades of written targets.
    Chain,
}

/// Overall result of one cascade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// Every step succeeded.
    Done,
    /// At least one step failed.
    PartialFailure,
}

/// One failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeFailure {
    /// Collection the step was aimed at.
    pub target_collection: String,
    /// Failed step.
    pub step: CascadeStep,
    /// Error text.
    pub message: String,
}

/// Summary of one cascade run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Storage writes that succeeded.
    pub steps_applied: usize,
    /// Steps that failed, in execution order.
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    /// `Done` when nothing failed.
    pub fn outcome(&self) -> CascadeOutcome {
        if self.failures.is_empty() {
            CascadeOutcome::Done
        } else {
            CascadeOutcome::PartialFailure
        }
    }
}

/// Completion handle for a dispatched cascade.
///
/// Dropping the handle leaves the cascade running.
#[derive(Debug)]
pub struct CascadeHandle {
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Ready(CascadeReport),
    Pending(JoinHandle<CascadeReport>),
}

impl CascadeHandle {
    pub(crate) fn ready(report: CascadeReport) -> Self {
        Self {
            state: HandleState::Ready(report),
        }
    }

    fn pending(task: JoinHandle<CascadeReport>) -> Self {
        Self {
            state: HandleState::Pending(task),
        }
    }

    /// Whether the cascade has finished.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Ready(_) => true,
            HandleState::Pending(task) => task.is_finished(),
        }
    }

    /// Waits for every step, including chained ones.
    pub async fn wait(self) -> Result<CascadeReport, CascadeError> {
        match self.state {
            HandleState::Ready(report) => Ok(report),
            HandleState::Pending(task) => task
                .await
                .map_err(|err| CascadeError::Join(err.to_string())),
        }
    }

    /// Lets the cascade run unobserved.
    pub fn detach(self) {}
}

struct Job {
    plan: CascadePlan,
    action: CascadeAction,
    depth: usize,
}

/// Applies cascade plans against a store on background tasks.
#[derive(Clone)]
pub struct CascadeExecutor {
    store: SharedStore,
    registry: Arc<SchemaRegistry>,
    events: broadcast::Sender<CascadeEvent>,
    max_depth: usize,
}

impl CascadeExecutor {
    /// `max_depth` bounds how many hops nested cascades may chain.
    pub fn new(
        store: SharedStore,
        registry: Arc<SchemaRegistry>,
        events: broadcast::Sender<CascadeEvent>,
        max_depth: usize,
    ) -> Self {
        Self {
            store,
            registry,
            events,
            max_depth,
        }
    }

    /// Spawns a task running `plans` and returns at once.
    ///
    /// `failures` carries errors already hit while building the plans so
    /// they end up in the same report.
    pub fn dispatch(
        &self,
        source_collection: &str,
        source_id: &DocId,
        action: CascadeAction,
        plans: Vec<CascadePlan>,
        failures: Vec<CascadeFailure>,
    ) -> CascadeHandle {
        if plans.is_empty() {
            let report = CascadeReport {
                steps_applied: 0,
                failures,
            };
            self.finish(source_collection, source_id, &report);
            return CascadeHandle::ready(report);
        }

        let span = info_span!(
            "cascade",
            source = %source_collection,
            id = %source_id,
            action = ?action,
        );
        let this = self.clone();
        let (collection, id) = (source_collection.to_string(), source_id.clone());
        let task = tokio::spawn(
            async move { this.run(&collection, &id, action, plans, failures).await }
                .instrument(span),
        );
        CascadeHandle::pending(task)
    }

    /// Runs `plans` to completion on the current task.
    pub async fn run(
        &self,
        source_collection: &str,
        source_id: &DocId,
        action: CascadeAction,
        plans: Vec<CascadePlan>,
        failures: Vec<CascadeFailure>,
    ) -> CascadeReport {
        let mut report = CascadeReport {
            steps_applied: 0,
            failures,
        };
        let mut queue: VecDeque<Job> = plans
            .into_iter()
            .map(|plan| Job {
                plan,
                action,
                depth: 0,
            })
            .collect();

        while let Some(job) = queue.pop_front() {
            self.execute(&job, &mut queue, &mut report).await;
        }

        self.finish(source_collection, source_id, &report);
        report
    }

    async fn execute(&self, job: &Job, queue: &mut VecDeque<Job>, report: &mut CascadeReport) {
        let plan = &job.plan;
        let config = &plan.config;
        let collection = config.target_collection.as_str();
        if let Err(err) = config.validate() {
            self.fail(report, collection, CascadeStep::Prepare, err.to_string());
            return;
        }
        let array_path = config.through_property.as_deref().unwrap_or_default();

        let written = match job.action {
            CascadeAction::Save => {
                if let Some(prior) = &config.prior_match_filter {
                    let result = match config.arity {
                        Arity::ToOne => {
                            self.store
                                .update_where(collection, prior, plan.set_document(&plan.cleared))
                                .await
                        }
                        Arity::ToMany => {
                            self.store
                                .remove_array_element_by_id(
                                    collection,
                                    prior,
                                    array_path,
                                    &plan.source_id,
                                )
                                .await
                        }
                    };
                    self.record(report, collection, CascadeStep::RemovePrior, result);
                }

                let result = match config.arity {
                    Arity::ToOne => {
                        self.store
                            .update_where(
                                collection,
                                &config.match_filter,
                                plan.set_document(&plan.payload),
                            )
                            .await
                    }
                    Arity::ToMany => {
                        self.store
                            .upsert_array_element_by_id(
                                collection,
                                &config.match_filter,
                                array_path,
                                &plan.source_id,
                                Value::Object(plan.payload.clone()),
                            )
                            .await
                    }
                };
                self.record(report, collection, CascadeStep::Write, result)
            }
            CascadeAction::Delete => {
                let result = match config.arity {
                    Arity::ToOne => {
                        self.store
                            .update_where(
                                collection,
                                &config.match_filter,
                                plan.set_document(&plan.cleared),
                            )
                            .await
                    }
                    Arity::ToMany => {
                        self.store
                            .remove_array_element_by_id(
                                collection,
                                &config.match_filter,
                                array_path,
                                &plan.source_id,
                            )
                            .await
                    }
                };
                self.record(report, collection, CascadeStep::Remove, result)
            }
        };

        if written && config.nested {
            self.chain(job, queue, report).await;
        }
    }

    async fn chain(&self, job: &Job, queue: &mut VecDeque<Job>, report: &mut CascadeReport) {
        let config = &job.plan.config;
        let collection = config.target_collection.as_str();
        if job.depth >= self.max_depth {
            let message = format!("nested cascade deeper than {} hops", self.max_depth);
            self.fail(report, collection, CascadeStep::Chain, message);
            return;
        }

        let targets = match self.store.find(collection, &config.match_filter).await {
            Ok(targets) => targets,
            Err(err) => {
                self.fail(report, collection, CascadeStep::Chain, err.to_string());
                return;
            }
        };
        debug!(target_collection = collection, targets = targets.len(), "chaining nested cascade");

        for body in &targets {
            match self.registry.plans_for_stored(collection, body) {
                Ok(plans) => queue.extend(plans.into_iter().map(|plan| Job {
                    plan,
                    action: CascadeAction::Save,
                    depth: job.depth + 1,
                })),
                Err(err) => self.fail(report, collection, CascadeStep::Chain, err.to_string()),
            }
        }
    }

    fn record(
        &self,
        report: &mut CascadeReport,
        collection: &str,
        step: CascadeStep,
        result: PersistResult<usize>,
    ) -> bool {
        match result {
            Ok(matched) => {
                report.steps_applied += 1;
                debug!(target_collection = collection, ?step, matched, "cascade step applied");
                let _ = self.events.send(CascadeEvent::StepApplied {
                    target_collection: collection.to_string(),
                    step,
                    matched,
                });
                true
            }
            Err(err) => {
                self.fail(report, collection, step, err.to_string());
                false
            }
        }
    }

    fn fail(&self, report: &mut CascadeReport, collection: &str, step: CascadeStep, message: String) {
        warn!(target_collection = collection, ?step, error = %message, "cascade step failed");
        let _ = self.events.send(CascadeEvent::StepFailed {
            target_collection: collection.to_string(),
            step,
            message: message.clone(),
        });
        report.failures.push(CascadeFailure {
            target_collection: collection.to_string(),
            step,
            message,
        });
    }

    fn finish(&self, source_collection: &str, source_id: &DocId, report: &CascadeReport) {
        let outcome = report.outcome();
        info!(
            steps = report.steps_applied,
            failures = report.failures.len(),
            ?outcome,
            "cascade finished"
        );
        let _ = self.events.send(CascadeEvent::Finished {
            source_collection: source_collection.to_string(),
            source_id: source_id.clone(),
            outcome,
        });
    }
}
