//! Paginated reads and batched writes against the store
//!
//! Inputs come in two shapes:
//! - file-backed containers (`task:hasFile`): one unit per file, listed page
//!   by page and parsed from shared storage
//! - graph-backed containers (`task:hasGraph`): one unit, read with
//!   `ceil(N/P)` ordered `LIMIT/OFFSET` pages on the high-load endpoint
//!
//! Writes are split into fixed-size batches, each inserted with a bounded
//! number of attempts.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use harvest_shacl::rdf::parse_turtle;
use harvest_sparql::escape::iri;
use harvest_sparql::Endpoint;
use oxigraph::model::{Graph, TripleRef};

use crate::config::{BatchFailurePolicy, PipelineConfig};
use crate::error::PipelineError;
use crate::queries::names;
use crate::repository::TaskRepository;
use crate::storage::SharedStorage;
use crate::types::{DataContainer, ModelByDerived, Task};

/// Where a container's data lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Files linked with `task:hasFile`
    Files,
    /// A named graph
    Graph(String),
}

/// Outcome of a successful batched import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Batches issued
    pub batches: usize,
    /// Triples inserted
    pub triples: usize,
}

/// Paging and batching settings
#[derive(Debug, Clone)]
pub struct PagingSettings {
    /// Triples per SELECT page
    pub page_size: usize,
    /// Triples per insert batch
    pub batch_size: usize,
    /// Batches in flight
    pub insert_concurrency: usize,
    /// Attempts per batch
    pub max_retry: usize,
    /// Pause between attempts
    pub retry_delay: Duration,
    /// Behavior once a batch exhausts its attempts
    pub policy: BatchFailurePolicy,
}

impl From<&PipelineConfig> for PagingSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            batch_size: config.batch_size.max(1),
            insert_concurrency: config.insert_concurrency.max(1),
            max_retry: config.max_retry.max(1),
            retry_delay: config.retry_delay(),
            policy: config.batch_failure_policy,
        }
    }
}

/// Paginated graph reader and batched writer
#[derive(Debug, Clone)]
pub struct PaginatedGraphIO {
    repository: Arc<TaskRepository>,
    storage: SharedStorage,
    settings: PagingSettings,
}

impl PaginatedGraphIO {
    /// Create the reader/writer
    pub fn new(
        repository: Arc<TaskRepository>,
        storage: SharedStorage,
        settings: PagingSettings,
    ) -> Self {
        Self {
            repository,
            storage,
            settings,
        }
    }

    /// Settings in use
    #[must_use]
    pub fn settings(&self) -> &PagingSettings {
        &self.settings
    }

    /// Detect whether a container is file- or graph-backed
    pub async fn source(&self, container: &DataContainer) -> Result<InputSource, PipelineError> {
        let has_files = self
            .repository
            .ask(names::HAS_FILE_SOURCE, &[("container", &iri(&container.uri)?)])
            .await?;
        if has_files {
            return Ok(InputSource::Files);
        }
        if container.graph_uri != container.uri {
            return Ok(InputSource::Graph(container.graph_uri.clone()));
        }
        Err(PipelineError::NotFound(format!(
            "input data of container <{}>",
            container.uri
        )))
    }

    /// Number of units in a container
    pub async fn count_units(
        &self,
        container: &DataContainer,
        source: &InputSource,
    ) -> Result<usize, PipelineError> {
        match source {
            InputSource::Files => {
                self.repository
                    .count(
                        names::COUNT_INPUT_FILES,
                        &[("container", &iri(&container.uri)?)],
                        Endpoint::Default,
                    )
                    .await
            }
            InputSource::Graph(_) => Ok(1),
        }
    }

    /// Units `offset..offset + limit` of a container
    pub async fn fetch_units(
        &self,
        container: &DataContainer,
        source: &InputSource,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ModelByDerived>, PipelineError> {
        match source {
            InputSource::Files => self.fetch_files(container, offset, limit).await,
            InputSource::Graph(graph) if offset == 0 && limit > 0 => {
                Ok(vec![ModelByDerived::new(graph.clone(), self.fetch_graph(graph).await?)])
            }
            InputSource::Graph(_) => Ok(Vec::new()),
        }
    }

    /// Every unit of a container, page by page
    pub async fn fetch_paged(
        &self,
        container: &DataContainer,
    ) -> Result<Vec<ModelByDerived>, PipelineError> {
        let source = self.source(container).await?;
        let total = self.count_units(container, &source).await?;
        let page = self.settings.page_size;
        let mut units = Vec::with_capacity(total);
        for offset in (0..total).step_by(page) {
            units.extend(self.fetch_units(container, &source, offset, page).await?);
        }
        Ok(units)
    }

    /// Read a whole graph with `ceil(N/P)` pages
    pub async fn fetch_graph(&self, graph_uri: &str) -> Result<Graph, PipelineError> {
        let graph = iri(graph_uri)?;
        let count = self
            .repository
            .count(names::COUNT_GRAPH_TRIPLES, &[("graph", &graph)], Endpoint::HighLoad)
            .await?;
        let page_size = self.settings.page_size;
        let pages = count.div_ceil(page_size);
        tracing::debug!(graph = graph_uri, triples = count, pages, "fetching graph");

        let mut result = Graph::new();
        for page in 0..pages {
            let limit = page_size.to_string();
            let offset = (page * page_size).to_string();
            let part = self
                .repository
                .select_graph(
                    names::FETCH_GRAPH_TRIPLES,
                    &[("graph", &graph), ("limit", &limit), ("offset", &offset)],
                    Endpoint::HighLoad,
                )
                .await?;
            for triple in &part {
                result.insert(triple);
            }
        }
        Ok(result)
    }

    async fn fetch_files(
        &self,
        container: &DataContainer,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ModelByDerived>, PipelineError> {
        let rows = self
            .repository
            .select(
                names::FETCH_INPUT_FILES,
                &[
                    ("container", &iri(&container.uri)?),
                    ("limit", &limit.to_string()),
                    ("offset", &offset.to_string()),
                ],
                Endpoint::Default,
            )
            .await?;
        let mut units = Vec::with_capacity(rows.len());
        for row in rows {
            let path = row.iri("path").unwrap_or_default();
            let derived_from = row
                .iri("derivedFrom")
                .or_else(|| row.iri("logicalFile"))
                .unwrap_or(path)
                .to_string();
            let bytes = self.storage.read(path).await?;
            let graph = parse_turtle(&bytes)?;
            tracing::debug!(path, derived_from = %derived_from, triples = graph.len(), "unit loaded");
            units.push(ModelByDerived::new(derived_from, graph));
        }
        Ok(units)
    }

    /// Insert `graph` into `graph_uri` in batches.
    ///
    /// Each batch gets up to `max_retry` attempts. Under
    /// [`BatchFailurePolicy::Continue`] every batch is tried before the
    /// exhaustion is reported; under [`BatchFailurePolicy::Abort`] no new
    /// batch starts after the first exhausted one. Nothing is written to the
    /// task here: the orchestrator records the failure once per run.
    pub async fn import_batched(
        &self,
        task: &Task,
        graph_uri: &str,
        graph: &Graph,
    ) -> Result<ImportSummary, PipelineError> {
        let batches = split_batches(graph, self.settings.batch_size);
        let total = batches.len();
        tracing::debug!(
            graph = graph_uri,
            triples = graph.len(),
            batches = total,
            batch_size = self.settings.batch_size,
            "importing triples"
        );

        let mut attempts = stream::iter(batches.into_iter().enumerate())
            .map(move |(index, batch)| async move {
                self.insert_with_retry(graph_uri, index, &batch).await
            })
            .buffer_unordered(self.settings.insert_concurrency);

        let mut failed = 0;
        while let Some(outcome) = attempts.next().await {
            if outcome.is_err() {
                failed += 1;
                if self.settings.policy == BatchFailurePolicy::Abort {
                    break;
                }
            }
        }
        drop(attempts);

        if failed == 0 {
            return Ok(ImportSummary {
                batches: total,
                triples: graph.len(),
            });
        }

        tracing::error!(task = %task.uri, graph = graph_uri, failed, total, "batches exhausted their attempts");
        Err(PipelineError::BatchesExhausted {
            graph: graph_uri.to_string(),
            failed,
            total,
        })
    }

    async fn insert_with_retry(
        &self,
        graph_uri: &str,
        index: usize,
        batch: &Graph,
    ) -> Result<(), PipelineError> {
        let max = self.settings.max_retry;
        let mut attempt = 1;
        loop {
            match self.repository.insert_triples(graph_uri, batch).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= max => {
                    tracing::error!(graph = graph_uri, batch = index, attempt, max, error = %e, "giving up on batch");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(graph = graph_uri, batch = index, attempt, max, error = %e, "batch insert failed, retrying");
                    attempt += 1;
                    if !self.settings.retry_delay.is_zero() {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }
    }
}

/// Split a graph into batches of at most `size` triples
#[must_use]
pub fn split_batches(graph: &Graph, size: usize) -> Vec<Graph> {
    let triples: Vec<TripleRef<'_>> = graph.iter().collect();
    triples
        .chunks(size.max(1))
        .map(|chunk| {
            let mut batch = Graph::new();
            for triple in chunk {
                batch.insert(*triple);
            }
            batch
        })
        .collect()
}
