//! Bounded concurrent processing of a task's units
//!
//! Pages of units are fetched in increasing offset order. Within a page each
//! unit runs as its own tokio task, gated by a semaphore; the page is joined
//! before the next one is fetched. A failing unit fails the run: the page
//! still joins, no further page is fetched and the first failure is
//! returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::paging::PaginatedGraphIO;
use crate::types::{DataContainer, ModelByDerived, Task};

/// Work done for one unit
#[async_trait]
pub trait UnitHandler: Send + Sync + 'static {
    /// Process one unit of `task`
    async fn handle(&self, task: &Task, unit: ModelByDerived) -> Result<(), PipelineError>;
}

/// Counters of a completed fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanOutSummary {
    /// Pages fetched
    pub pages: usize,
    /// Units processed
    pub units: usize,
}

/// Fan-out settings
#[derive(Debug, Clone)]
pub struct FanOutSettings {
    /// Units per page
    pub page_size: usize,
    /// Units running at once
    pub max_concurrent: usize,
    /// Pause between unit starts
    pub start_delay: Duration,
}

impl From<&PipelineConfig> for FanOutSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            page_size: config.unit_page_size.max(1),
            max_concurrent: config.max_concurrent_units.max(1),
            start_delay: config.unit_start_delay(),
        }
    }
}

/// Runs a [`UnitHandler`] over every unit of a container
#[derive(Debug, Clone)]
pub struct UnitFanOutProcessor {
    io: Arc<PaginatedGraphIO>,
    settings: FanOutSettings,
}

impl UnitFanOutProcessor {
    /// Create a processor
    pub fn new(io: Arc<PaginatedGraphIO>, settings: FanOutSettings) -> Self {
        Self { io, settings }
    }

    /// Process every unit of `container`
    pub async fn process(
        &self,
        task: &Task,
        container: &DataContainer,
        handler: Arc<dyn UnitHandler>,
    ) -> Result<FanOutSummary, PipelineError> {
        let source = self.io.source(container).await?;
        let total = self.io.count_units(container, &source).await?;
        let page_size = self.settings.page_size;
        let pages = total.div_ceil(page_size);
        tracing::info!(task = %task.uri, container = %container.uri, units = total, pages, "processing units");

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent));
        let mut summary = FanOutSummary::default();
        for page in 0..pages {
            let units = self
                .io
                .fetch_units(container, &source, page * page_size, page_size)
                .await?;
            summary.pages += 1;
            summary.units += self.run_page(task, units, &semaphore, &handler).await?;
            tracing::debug!(task = %task.uri, page, of = pages, "page joined");
        }
        Ok(summary)
    }

    async fn run_page(
        &self,
        task: &Task,
        units: Vec<ModelByDerived>,
        semaphore: &Arc<Semaphore>,
        handler: &Arc<dyn UnitHandler>,
    ) -> Result<usize, PipelineError> {
        let mut running = JoinSet::new();
        for (i, unit) in units.into_iter().enumerate() {
            if i > 0 && !self.settings.start_delay.is_zero() {
                tokio::time::sleep(self.settings.start_delay).await;
            }
            let permit = Arc::clone(semaphore)
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Join(e.to_string()))?;
            let handler = Arc::clone(handler);
            let task = task.clone();
            running.spawn(async move {
                let _permit = permit;
                let derived_from = unit.derived_from.clone();
                handler
                    .handle(&task, unit)
                    .await
                    .map_err(|e| PipelineError::unit(derived_from, e))
            });
        }

        let mut completed = 0;
        let mut first_error = None;
        while let Some(joined) = running.join_next().await {
            let outcome = joined
                .map_err(|e| PipelineError::Join(e.to_string()))
                .and_then(|result| result);
            match outcome {
                Ok(()) => completed += 1,
                Err(e) => {
                    tracing::error!(task = %task.uri, error = %e, "unit failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(completed),
        }
    }
}
