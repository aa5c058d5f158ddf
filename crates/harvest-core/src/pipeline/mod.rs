//! Operation pipelines
//!
//! Each [`Operation`] maps to one [`Pipeline`]. Pipelines share the
//! collaborators in [`PipelineContext`].

mod filtering;
mod validating;

use std::sync::Arc;

use async_trait::async_trait;
use harvest_shacl::{Partition, ShaclEngine, ValidationReport};
use oxigraph::model::Graph;

pub use filtering::FilteringPipeline;
pub use validating::ValidatingPipeline;

use crate::composer::ResultGraphComposer;
use crate::error::PipelineError;
use crate::fanout::UnitFanOutProcessor;
use crate::paging::PaginatedGraphIO;
use crate::repository::TaskRepository;
use crate::types::{DataContainer, Operation, Task};

/// Logical name of the conforming triples file
pub const VALID_TRIPLES_FILE: &str = "valid-triples.ttl";
/// Logical name of the report file
pub const VALIDATION_REPORT_FILE: &str = "validation-report.ttl";
/// Logical name of the non-conforming triples file
pub const ERROR_TRIPLES_FILE: &str = "error-triples.ttl";

/// A runnable operation
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Operation handled
    fn operation(&self) -> Operation;

    /// Run the operation for a task that is already `Busy`
    async fn run(&self, task: &Task) -> Result<(), PipelineError>;
}

/// Collaborators shared by every pipeline
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Task records
    pub repository: Arc<TaskRepository>,
    /// Paginated reads and batched writes
    pub io: Arc<PaginatedGraphIO>,
    /// Artifact publication
    pub composer: Arc<ResultGraphComposer>,
    /// Unit fan-out
    pub fanout: Arc<UnitFanOutProcessor>,
    /// Shape profile
    pub engine: ShaclEngine,
}

impl PipelineContext {
    /// First input container of a task
    pub(crate) async fn input_container(&self, task: &Task) -> Result<DataContainer, PipelineError> {
        let mut containers = self.repository.select_input_containers(task).await?;
        if containers.len() > 1 {
            tracing::warn!(task = %task.uri, count = containers.len(), "several input containers, using the first");
        }
        Ok(containers.swap_remove(0))
    }

    /// Validate and split a unit off the async workers
    pub(crate) async fn partition(&self, graph: Graph) -> Result<Partition, PipelineError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.partition(&graph))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))
    }

    /// Validate a unit off the async workers
    pub(crate) async fn validate(&self, graph: Graph) -> Result<ValidationReport, PipelineError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.validate(&graph))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))
    }
}
