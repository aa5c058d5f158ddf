//! Task and container records in the store
//!
//! Every operation renders a named template from the [`QueryStore`] and runs
//! it with the repository's [`RequestContext`]. Writes target the graph named
//! by `task.graph`.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use harvest_sparql::escape::{iri, string_literal, typed_literal};
use harvest_sparql::{Endpoint, GraphStore, QueryStore, RequestContext, Solution};
use oxigraph::model::{Graph, NamedNode};
use uuid::Uuid;

use crate::config::PrefixConfig;
use crate::error::PipelineError;
use crate::queries::names;
use crate::state_machine::validate_transition;
use crate::types::{DataContainer, Operation, StoredFile, Task, TaskStatus};
use crate::vocab::{DEFAULT_ERROR_MESSAGE, XSD_DATE_TIME, XSD_INTEGER};

/// Store-backed access to tasks and their result containers
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn GraphStore>,
    queries: QueryStore,
    ctx: RequestContext,
    prefixes: PrefixConfig,
}

impl std::fmt::Debug for TaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRepository")
            .field("ctx", &self.ctx)
            .field("prefixes", &self.prefixes)
            .finish_non_exhaustive()
    }
}

impl TaskRepository {
    /// Create a repository
    pub fn new(
        store: Arc<dyn GraphStore>,
        queries: QueryStore,
        ctx: RequestContext,
        prefixes: PrefixConfig,
    ) -> Self {
        Self {
            store,
            queries,
            ctx,
            prefixes,
        }
    }

    /// IRI prefixes used for generated resources
    #[must_use]
    pub fn prefixes(&self) -> &PrefixConfig {
        &self.prefixes
    }

    /// Check whether `subject` is a task; subjects that are not IRIs never are
    pub async fn is_task(&self, subject: &str) -> Result<bool, PipelineError> {
        let subject = match iri(subject) {
            Ok(subject) => subject,
            Err(e) => {
                tracing::debug!(error = %e, "subject is not an IRI");
                return Ok(false);
            }
        };
        let query = self.queries.render(names::IS_TASK, &[("subject", &subject)])?;
        Ok(self.store.ask(&query, &self.ctx).await?)
    }

    /// Load a task; `None` when it has no complete record
    pub async fn load_task(&self, subject: &str) -> Result<Option<Task>, PipelineError> {
        let query = self
            .queries
            .render(names::LOAD_TASK, &[("subject", &iri(subject)?)])?;
        let rows = self.store.select(&query, &self.ctx).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let task = task_from_row(row)?;
        tracing::debug!(task = %task.uri, status = %task.status, operation = %task.operation_iri, "task loaded");
        Ok(Some(task))
    }

    /// Write a new status and return the updated task
    pub async fn update_status(
        &self,
        task: &Task,
        status: TaskStatus,
    ) -> Result<Task, PipelineError> {
        validate_transition(task.status, status)?;
        tracing::debug!(task = %task.uri, from = %task.status, to = %status, "updating task status");
        let now = now();
        let query = self.queries.render(
            names::UPDATE_TASK_STATUS,
            &[
                ("graph", &iri(&task.graph)?),
                ("task", &iri(&task.uri)?),
                ("status", &iri(status.iri())?),
                ("now", &typed_literal(&now, XSD_DATE_TIME)),
            ],
        )?;
        self.store.update(&query, &self.ctx).await?;
        Ok(task.with_status(status).with_modified(now))
    }

    /// Input containers of a task; fails when there are none
    pub async fn select_input_containers(
        &self,
        task: &Task,
    ) -> Result<Vec<DataContainer>, PipelineError> {
        let query = self.queries.render(
            names::SELECT_INPUT_CONTAINERS,
            &[("graph", &iri(&task.graph)?), ("task", &iri(&task.uri)?)],
        )?;
        let rows = self.store.select(&query, &self.ctx).await?;
        let containers: Vec<DataContainer> = rows
            .iter()
            .filter_map(|row| {
                let uri = row.iri("container")?.to_string();
                Some(DataContainer {
                    id: row.value("id").unwrap_or_default().to_string(),
                    graph_uri: row.iri("graph").unwrap_or(&uri).to_string(),
                    validation_graph_uri: row.iri("validationGraph").map(str::to_string),
                    uri,
                })
            })
            .collect();
        if containers.is_empty() {
            return Err(PipelineError::NotFound("input container".into()));
        }
        Ok(containers)
    }

    /// Link a file container to a task
    pub async fn append_result_file(
        &self,
        task: &Task,
        container: &DataContainer,
    ) -> Result<(), PipelineError> {
        let query = self.queries.render(
            names::APPEND_RESULT_FILE,
            &[
                ("graph", &iri(&task.graph)?),
                ("task", &iri(&task.uri)?),
                ("container", &iri(&container.uri)?),
                ("containerId", &string_literal(&container.id)),
                ("file", &iri(&container.graph_uri)?),
            ],
        )?;
        self.store.update(&query, &self.ctx).await?;
        Ok(())
    }

    /// Link a graph container to a task
    pub async fn append_result_graph(
        &self,
        task: &Task,
        container: &DataContainer,
    ) -> Result<(), PipelineError> {
        let validation_graph = match &container.validation_graph_uri {
            Some(graph) => format!("; task:hasValidationGraph {} ", iri(graph)?),
            None => String::new(),
        };
        let query = self.queries.render(
            names::APPEND_RESULT_GRAPH,
            &[
                ("graph", &iri(&task.graph)?),
                ("task", &iri(&task.uri)?),
                ("container", &iri(&container.uri)?),
                ("containerId", &string_literal(&container.id)),
                ("resultGraph", &iri(&container.graph_uri)?),
                ("validationGraph", &validation_graph),
            ],
        )?;
        self.store.update(&query, &self.ctx).await?;
        Ok(())
    }

    /// Record an error on a task; returns the error record IRI
    pub async fn append_error(
        &self,
        task: &Task,
        message: Option<&str>,
    ) -> Result<String, PipelineError> {
        let id = Uuid::new_v4().simple().to_string();
        let uri = format!("{}{id}", self.prefixes.error);
        let message = message.unwrap_or(DEFAULT_ERROR_MESSAGE);
        tracing::debug!(task = %task.uri, error = %uri, message, "appending task error");
        let query = self.queries.render(
            names::APPEND_TASK_ERROR,
            &[
                ("graph", &iri(&task.graph)?),
                ("task", &iri(&task.uri)?),
                ("error", &iri(&uri)?),
                ("id", &string_literal(&id)),
                ("message", &string_literal(message)),
            ],
        )?;
        self.store.update(&query, &self.ctx).await?;
        Ok(uri)
    }

    /// Record metadata of a written file
    pub async fn register_file(
        &self,
        task: &Task,
        file: &StoredFile,
        derived_from: &str,
    ) -> Result<(), PipelineError> {
        let size = file.size.to_string();
        let query = self.queries.render(
            names::REGISTER_FILE,
            &[
                ("graph", &iri(&task.graph)?),
                ("physicalFile", &iri(&file.physical_uri)?),
                ("logicalFile", &iri(&file.logical_uri)?),
                ("physicalId", &string_literal(&file.physical_id)),
                ("physicalName", &string_literal(&file.physical_name)),
                ("logicalId", &string_literal(&file.logical_id)),
                ("logicalName", &string_literal(&file.logical_name)),
                ("derivedFrom", &iri(derived_from)?),
                ("now", &typed_literal(&now(), XSD_DATE_TIME)),
                ("contentType", &string_literal(&file.content_type)),
                ("fileSize", &typed_literal(&size, XSD_INTEGER)),
                ("extension", &string_literal(&file.extension)),
            ],
        )?;
        self.store.update(&query, &self.ctx).await?;
        Ok(())
    }

    /// Insert triples into a graph with one `INSERT DATA`
    pub async fn insert_triples(&self, graph_uri: &str, graph: &Graph) -> Result<(), PipelineError> {
        let graph_uri = NamedNode::new(graph_uri)
            .map_err(|e| PipelineError::InvalidInput(format!("graph IRI '{graph_uri}': {e}")))?;
        self.store.insert_graph(&graph_uri, graph, &self.ctx).await?;
        Ok(())
    }

    /// Run a named ASK template
    pub(crate) async fn ask(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<bool, PipelineError> {
        let query = self.queries.render(name, params)?;
        Ok(self.store.ask(&query, &self.ctx).await?)
    }

    /// Run a named SELECT template
    pub(crate) async fn select(
        &self,
        name: &str,
        params: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<Vec<Solution>, PipelineError> {
        let query = self.queries.render(name, params)?;
        Ok(self.store.select(&query, &self.ctx.on(endpoint)).await?)
    }

    /// Run a named `SELECT ?s ?p ?o` template and collect the triples
    pub(crate) async fn select_graph(
        &self,
        name: &str,
        params: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<Graph, PipelineError> {
        let query = self.queries.render(name, params)?;
        Ok(self.store.select_graph(&query, &self.ctx.on(endpoint)).await?)
    }

    /// Run a named COUNT template; reads `?count`
    pub(crate) async fn count(
        &self,
        name: &str,
        params: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<usize, PipelineError> {
        let rows = self.select(name, params, endpoint).await?;
        let Some(value) = rows.first().and_then(|row| row.value("count")) else {
            return Ok(0);
        };
        value
            .parse()
            .map_err(|_| PipelineError::InvalidInput(format!("count '{value}' is not a number")))
    }
}

fn task_from_row(row: &Solution) -> Result<Task, PipelineError> {
    let required = |variable: &str| {
        row.value(variable)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::InvalidInput(format!("task record lacks ?{variable}")))
    };
    let status_iri = required("status")?;
    let status = TaskStatus::from_iri(&status_iri)
        .ok_or_else(|| PipelineError::InvalidInput(format!("unknown task status <{status_iri}>")))?;
    let operation_iri = required("operation")?;
    Ok(Task {
        uri: required("task")?,
        job: required("job")?,
        id: required("id")?,
        created: required("created")?,
        modified: required("modified")?,
        operation: Operation::from_iri(&operation_iri),
        operation_iri,
        status,
        graph: required("graph")?,
        error: row.iri("error").map(str::to_string),
        index: required("index")?,
    })
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Term;

    fn row(bindings: &[(&str, Term)]) -> Solution {
        Solution::from_bindings(bindings.iter().map(|(k, v)| ((*k).to_string(), v.clone())))
    }

    fn node(value: &str) -> Term {
        Term::from(NamedNode::new_unchecked(value))
    }

    fn literal(value: &str) -> Term {
        Term::from(oxigraph::model::Literal::new_simple_literal(value))
    }

    #[test]
    fn task_row_with_unknown_operation_keeps_raw_iri() {
        let task = task_from_row(&row(&[
            ("task", node("http://ex.org/task")),
            ("job", node("http://ex.org/job")),
            ("id", literal("t1")),
            ("created", literal("2024-01-01T00:00:00Z")),
            ("modified", literal("2024-01-01T00:00:00Z")),
            ("operation", node("http://ex.org/Unknown")),
            ("status", node(crate::vocab::status::SCHEDULED)),
            ("graph", node("http://ex.org/graph")),
            ("index", literal("0")),
        ]))
        .unwrap();
        assert_eq!(task.operation, None);
        assert_eq!(task.operation_iri, "http://ex.org/Unknown");
        assert_eq!(task.status, TaskStatus::Scheduled);
        assert_eq!(task.error, None);
    }

    #[test]
    fn task_row_with_unknown_status_is_rejected() {
        let err = task_from_row(&row(&[("status", node("http://ex.org/paused"))])).unwrap_err();
        assert!(err.to_string().contains("unknown task status"));
    }

    #[test]
    fn timestamps_are_utc_with_millis() {
        let stamp = now();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
