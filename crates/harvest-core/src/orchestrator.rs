//! Top-level task state machine
//!
//! A run:
//! 1. ignores subjects that are not tasks
//! 2. ignores tasks that cannot be loaded or have an unknown operation
//! 3. marks the task `Busy`
//! 4. runs the pipeline registered for the operation
//! 5. marks the task `Success`, or `Failed` with a short error record

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashSet;
use harvest_shacl::ShaclEngine;
use harvest_sparql::GraphStore;

use crate::composer::ResultGraphComposer;
use crate::config::WorkerConfig;
use crate::error::PipelineError;
use crate::fanout::{FanOutSettings, UnitFanOutProcessor};
use crate::paging::{PagingSettings, PaginatedGraphIO};
use crate::pipeline::{FilteringPipeline, Pipeline, PipelineContext, ValidatingPipeline};
use crate::queries::default_queries;
use crate::repository::TaskRepository;
use crate::state_machine::validate_transition;
use crate::storage::SharedStorage;
use crate::types::{Operation, Task, TaskStatus};
use crate::vocab::MAX_RETRY_MESSAGE;

/// Longest error message recorded on a task, in characters
pub const MAX_ERROR_MESSAGE_CHARS: usize = 100;

/// Why a subject was not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    /// Subject is not a task
    NotATask,
    /// Task record is incomplete
    NotFound,
    /// No pipeline for the task's operation
    UnknownOperation(String),
    /// Task status does not allow a new run
    NotRunnable(TaskStatus),
    /// A run of the same task is already in progress in this worker
    AlreadyRunning,
}

/// Result of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was written
    Ignored(Ignored),
    /// Task ended in `Success`
    Succeeded(Task),
    /// Task ended in `Failed`
    Failed {
        /// Task in its final state
        task: Task,
        /// Recorded message
        message: String,
    },
}

/// Dispatches tasks to their pipelines and drives their status
pub struct PipelineOrchestrator {
    repository: Arc<TaskRepository>,
    handlers: HashMap<Operation, Arc<dyn Pipeline>>,
    in_flight: DashSet<String>,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("operations", &self.handlers.keys().collect::<Vec<_>>())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Orchestrator without pipelines
    pub fn new(repository: Arc<TaskRepository>) -> Self {
        Self {
            repository,
            handlers: HashMap::new(),
            in_flight: DashSet::new(),
        }
    }

    /// Register the pipeline for its operation
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Arc<dyn Pipeline>) -> Self {
        self.handlers.insert(pipeline.operation(), pipeline);
        self
    }

    /// Wire repository, I/O, composer and both pipelines from configuration
    pub fn from_config(
        config: &WorkerConfig,
        store: Arc<dyn GraphStore>,
        engine: ShaclEngine,
    ) -> Result<Self, PipelineError> {
        let queries = match &config.query_overrides {
            Some(dir) => default_queries().with_overrides(dir)?,
            None => default_queries(),
        };
        let repository = Arc::new(TaskRepository::new(
            store,
            queries,
            config.store.request_context(),
            config.prefixes.clone(),
        ));
        let engine = engine.with_blank_prefix(config.prefixes.blank_node.as_str())?;
        let storage = SharedStorage::new(&config.storage.share_path);
        let io = Arc::new(PaginatedGraphIO::new(
            Arc::clone(&repository),
            storage.clone(),
            PagingSettings::from(&config.pipeline),
        ));
        let ctx = PipelineContext {
            repository: Arc::clone(&repository),
            io: Arc::clone(&io),
            composer: Arc::new(ResultGraphComposer::new(Arc::clone(&repository), storage)),
            fanout: Arc::new(UnitFanOutProcessor::new(io, FanOutSettings::from(&config.pipeline))),
            engine,
        };
        Ok(Self::new(repository)
            .with_pipeline(Arc::new(FilteringPipeline::new(ctx.clone())))
            .with_pipeline(Arc::new(ValidatingPipeline::new(ctx))))
    }

    /// Operations with a registered pipeline
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.handlers.keys().copied().collect()
    }

    /// Run the task denoted by `subject`.
    ///
    /// Any failure after the task went `Busy`, including a failed `Success`
    /// write, ends in `Failed`. Errors are returned only when the store fails
    /// before the task was touched or while writing `Failed`.
    pub async fn run(&self, subject: &str) -> Result<RunOutcome, PipelineError> {
        let Some(_guard) = InFlight::claim(&self.in_flight, subject) else {
            tracing::warn!(subject, "task already running in this worker");
            return Ok(RunOutcome::Ignored(Ignored::AlreadyRunning));
        };

        if !self.repository.is_task(subject).await? {
            tracing::debug!(subject, "not a task");
            return Ok(RunOutcome::Ignored(Ignored::NotATask));
        }
        let Some(task) = self.repository.load_task(subject).await? else {
            tracing::debug!(subject, "task record incomplete");
            return Ok(RunOutcome::Ignored(Ignored::NotFound));
        };
        let Some(pipeline) = task.operation.and_then(|op| self.handlers.get(&op)) else {
            tracing::debug!(subject, operation = %task.operation_iri, "unknown operation");
            return Ok(RunOutcome::Ignored(Ignored::UnknownOperation(
                task.operation_iri.clone(),
            )));
        };
        if validate_transition(task.status, TaskStatus::Busy).is_err() {
            tracing::info!(subject, status = %task.status, "task not runnable");
            return Ok(RunOutcome::Ignored(Ignored::NotRunnable(task.status)));
        }

        let task = self.repository.update_status(&task, TaskStatus::Busy).await?;
        tracing::info!(task = %task.uri, operation = %task.operation_iri, "task started");

        let finished = match pipeline.run(&task).await {
            Ok(()) => self.repository.update_status(&task, TaskStatus::Success).await,
            Err(e) => Err(e),
        };
        match finished {
            Ok(done) => {
                tracing::info!(task = %task.uri, "task succeeded");
                Ok(RunOutcome::Succeeded(done))
            }
            Err(e) => self.fail(&task, &e).await,
        }
    }

    /// Mark a busy task failed and append one error record
    async fn fail(&self, task: &Task, error: &PipelineError) -> Result<RunOutcome, PipelineError> {
        tracing::error!(task = %task.uri, error = %error, "task failed");
        let message = if error.is_batch_exhaustion() {
            MAX_RETRY_MESSAGE.to_string()
        } else {
            truncate(&error.to_string(), MAX_ERROR_MESSAGE_CHARS)
        };
        let failed = self.repository.update_status(task, TaskStatus::Failed).await?;
        let record = self.repository.append_error(&failed, Some(&message)).await?;
        Ok(RunOutcome::Failed {
            task: failed.with_error(record),
            message,
        })
    }
}

struct InFlight<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a DashSet<String>, key: &str) -> Option<Self> {
        set.insert(key.to_string()).then(|| Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

fn truncate(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}
