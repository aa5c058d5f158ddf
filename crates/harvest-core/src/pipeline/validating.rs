use std::sync::Arc;

use async_trait::async_trait;

use super::{Pipeline, PipelineContext, VALIDATION_REPORT_FILE};
use crate::error::PipelineError;
use crate::fanout::UnitHandler;
use crate::types::{ModelByDerived, Operation, Task};

/// Publishes a validation report for every unit without touching the data.
///
/// The result container points at the input graph together with the
/// task's validation graph.
#[derive(Debug, Clone)]
pub struct ValidatingPipeline {
    ctx: PipelineContext,
}

impl ValidatingPipeline {
    /// Create the pipeline
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Pipeline for ValidatingPipeline {
    fn operation(&self) -> Operation {
        Operation::Validating
    }

    async fn run(&self, task: &Task) -> Result<(), PipelineError> {
        let input = self.ctx.input_container(task).await?;
        let validation_graph = self.ctx.repository.prefixes().validating_graph_for(&task.id);
        tracing::info!(task = %task.uri, input = %input.uri, target = %validation_graph, "validating");

        let handler = Arc::new(ReportUnit {
            ctx: self.ctx.clone(),
            validation_graph: validation_graph.clone(),
        });
        let summary = self.ctx.fanout.process(task, &input, handler).await?;

        self.ctx
            .composer
            .link_graph(task, &input.graph_uri, Some(&validation_graph))
            .await?;
        tracing::info!(task = %task.uri, units = summary.units, "validation done");
        Ok(())
    }
}

struct ReportUnit {
    ctx: PipelineContext,
    validation_graph: String,
}

#[async_trait]
impl UnitHandler for ReportUnit {
    async fn handle(&self, task: &Task, unit: ModelByDerived) -> Result<(), PipelineError> {
        let report = self.ctx.validate(unit.graph).await?;
        tracing::info!(
            derived_from = %unit.derived_from,
            conforms = report.conforms,
            results = report.results.len(),
            "unit validated"
        );
        let report_graph = self.ctx.engine.report_graph(&report);
        self.ctx
            .composer
            .publish_file(task, &unit.derived_from, &report_graph, VALIDATION_REPORT_FILE)
            .await?;
        self.ctx
            .io
            .import_batched(task, &self.validation_graph, &report_graph)
            .await?;
        Ok(())
    }
}
