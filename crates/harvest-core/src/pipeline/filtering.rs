use std::sync::Arc;

use async_trait::async_trait;

use super::{
    Pipeline, PipelineContext, ERROR_TRIPLES_FILE, VALIDATION_REPORT_FILE, VALID_TRIPLES_FILE,
};
use crate::error::PipelineError;
use crate::fanout::UnitHandler;
use crate::types::{ModelByDerived, Operation, Task};

/// Keeps the conforming part of every unit.
///
/// Per unit: `valid-triples.ttl` is always published; for non-conforming
/// units the report and `error-triples.ttl` follow. Conforming triples are
/// imported into the task's filter graph, which is linked once all units
/// are done.
#[derive(Debug, Clone)]
pub struct FilteringPipeline {
    ctx: PipelineContext,
}

impl FilteringPipeline {
    /// Create the pipeline
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Pipeline for FilteringPipeline {
    fn operation(&self) -> Operation {
        Operation::Filtering
    }

    async fn run(&self, task: &Task) -> Result<(), PipelineError> {
        let input = self.ctx.input_container(task).await?;
        let target_graph = self.ctx.repository.prefixes().filter_graph_for(&task.id);
        tracing::info!(task = %task.uri, input = %input.uri, target = %target_graph, "filtering");

        let handler = Arc::new(FilterUnit {
            ctx: self.ctx.clone(),
            target_graph: target_graph.clone(),
        });
        let summary = self.ctx.fanout.process(task, &input, handler).await?;

        self.ctx.composer.link_graph(task, &target_graph, None).await?;
        tracing::info!(task = %task.uri, units = summary.units, pages = summary.pages, "filtering done");
        Ok(())
    }
}

struct FilterUnit {
    ctx: PipelineContext,
    target_graph: String,
}

#[async_trait]
impl UnitHandler for FilterUnit {
    async fn handle(&self, task: &Task, unit: ModelByDerived) -> Result<(), PipelineError> {
        let ModelByDerived {
            derived_from,
            graph,
        } = unit;
        let partition = self.ctx.partition(graph).await?;
        tracing::info!(
            derived_from = %derived_from,
            conforms = partition.report.conforms,
            valid = partition.conforming.len(),
            errored = partition.errored.len(),
            "unit validated"
        );

        let composer = &self.ctx.composer;
        composer
            .publish_file(task, &derived_from, &partition.conforming, VALID_TRIPLES_FILE)
            .await?;
        if !partition.report.conforms {
            let report = self.ctx.engine.report_graph(&partition.report);
            composer
                .publish_file(task, &derived_from, &report, VALIDATION_REPORT_FILE)
                .await?;
            composer
                .publish_file(task, &derived_from, &partition.errored, ERROR_TRIPLES_FILE)
                .await?;
        }

        self.ctx
            .io
            .import_batched(task, &self.target_graph, &partition.conforming)
            .await?;
        Ok(())
    }
}
