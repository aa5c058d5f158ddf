//! Result containers linking produced artifacts back to a task
//!
//! Every call creates a fresh container; nothing is merged or revised.

use std::sync::Arc;

use harvest_shacl::rdf::to_ntriples;
use oxigraph::model::Graph;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::repository::TaskRepository;
use crate::storage::SharedStorage;
use crate::types::{DataContainer, StoredFile, Task};

const EXTENSION: &str = "ttl";
const CONTENT_TYPE: &str = "text/turtle";

/// Writes artifacts and links them to tasks
#[derive(Debug, Clone)]
pub struct ResultGraphComposer {
    repository: Arc<TaskRepository>,
    storage: SharedStorage,
}

impl ResultGraphComposer {
    /// Create a composer
    pub fn new(repository: Arc<TaskRepository>, storage: SharedStorage) -> Self {
        Self {
            repository,
            storage,
        }
    }

    /// Link a file artifact to a task in a new container
    pub async fn link_file(
        &self,
        task: &Task,
        file_uri: &str,
    ) -> Result<DataContainer, PipelineError> {
        let container = DataContainer::generate(&self.repository.prefixes().data_container, file_uri);
        self.repository.append_result_file(task, &container).await?;
        tracing::debug!(task = %task.uri, container = %container.uri, file = file_uri, "file linked");
        Ok(container)
    }

    /// Link a graph artifact to a task in a new container
    pub async fn link_graph(
        &self,
        task: &Task,
        graph_uri: &str,
        validation_graph: Option<&str>,
    ) -> Result<DataContainer, PipelineError> {
        let mut container =
            DataContainer::generate(&self.repository.prefixes().data_container, graph_uri);
        if let Some(validation_graph) = validation_graph {
            container = container.with_validation_graph(validation_graph);
        }
        self.repository.append_result_graph(task, &container).await?;
        tracing::debug!(task = %task.uri, container = %container.uri, graph = graph_uri, "graph linked");
        Ok(container)
    }

    /// Serialize `graph`, store it, register its metadata and link it.
    ///
    /// Returns the container pointing at the logical file.
    pub async fn publish_file(
        &self,
        task: &Task,
        derived_from: &str,
        graph: &Graph,
        logical_name: &str,
    ) -> Result<DataContainer, PipelineError> {
        let file = self.write_file(graph, logical_name).await?;
        self.repository.register_file(task, &file, derived_from).await?;
        tracing::info!(
            task = %task.uri,
            file = %file.logical_uri,
            name = logical_name,
            triples = graph.len(),
            "file published"
        );
        self.link_file(task, &file.logical_uri).await
    }

    async fn write_file(&self, graph: &Graph, logical_name: &str) -> Result<StoredFile, PipelineError> {
        let physical_id = Uuid::new_v4().simple().to_string();
        let physical_name = format!("{physical_id}.{EXTENSION}");
        let size = self
            .storage
            .write(&physical_name, to_ntriples(graph).as_bytes())
            .await?;
        let logical_id = Uuid::new_v4().simple().to_string();
        Ok(StoredFile {
            physical_uri: SharedStorage::physical_uri(&physical_name),
            physical_id,
            physical_name,
            logical_uri: format!("{}{logical_id}", self.repository.prefixes().logical_file),
            logical_id,
            logical_name: logical_name.to_string(),
            size,
            extension: EXTENSION.to_string(),
            content_type: CONTENT_TYPE.to_string(),
        })
    }
}
