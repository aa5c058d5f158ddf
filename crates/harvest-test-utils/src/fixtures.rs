use std::path::Path;

use harvest_core::config::{PipelineConfig, WorkerConfig};
use harvest_core::vocab::{operation, status};
use harvest_shacl::rdf::parse_turtle;
use harvest_shacl::ShaclEngine;
use harvest_sparql::MemoryStore;
use oxigraph::model::{Graph, NamedNodeRef};

pub const TASK_GRAPH: &str = "http://mu.semte.ch/graphs/harvesting";
pub const JOB: &str = "http://redpencil.data.gift/id/job/1";
pub const DATA_GRAPH: &str = "http://mu.semte.ch/graphs/harvesting/imported/1";
pub const FILTERING: &str = operation::FILTERING;
pub const VALIDATING: &str = operation::VALIDATING;
pub const UNKNOWN_OPERATION: &str = "http://lblod.data.gift/id/jobs/concept/TaskOperation/Unknown";

/// Documents need a title (string) and at most one author (IRI).
pub const SHAPES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://ex.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:DocumentShape a sh:NodeShape ;
    sh:targetClass ex:Document ;
    sh:property [ sh:path ex:title ; sh:minCount 1 ; sh:datatype xsd:string ] ;
    sh:property [ sh:path ex:author ; sh:maxCount 1 ; sh:nodeKind sh:IRI ] .
"#;

pub const CONFORMING_DATA: &str = r#"
@prefix ex: <http://ex.org/> .
ex:doc1 a ex:Document ; ex:title "First" ; ex:author ex:alice .
ex:doc2 a ex:Document ; ex:title "Second" .
"#;

/// `ex:doc2 ex:title 42` is the only offending statement.
pub const ONE_VIOLATION_DATA: &str = r#"
@prefix ex: <http://ex.org/> .
ex:doc1 a ex:Document ; ex:title "First" ; ex:author ex:alice .
ex:doc2 a ex:Document ; ex:title "Second" , 42 .
"#;

pub const OFFENDING_TRIPLE: &str = "<http://ex.org/doc2> <http://ex.org/title> \"42\"^^<http://www.w3.org/2001/XMLSchema#integer> .";

pub fn engine() -> ShaclEngine {
    ShaclEngine::from_turtle(SHAPES).unwrap()
}

pub fn turtle(input: &str) -> Graph {
    parse_turtle(input.as_bytes()).unwrap()
}

pub fn named(iri: &str) -> NamedNodeRef<'_> {
    NamedNodeRef::new(iri).unwrap()
}

/// Worker configuration for tests: no retry delay, storage under `share`
pub fn test_config(share: &Path) -> WorkerConfig {
    WorkerConfig::default()
        .with_share_path(share)
        .with_pipeline(
            PipelineConfig::default()
                .with_page_size(2)
                .with_batch_size(2)
                .with_unit_page_size(2)
                .with_max_concurrent_units(2)
                .with_max_retry(3)
                .with_retry_delay_ms(0),
        )
}

#[derive(Debug, Clone)]
pub struct TaskFixture {
    pub uri: String,
    pub id: String,
    pub operation: String,
    pub status: String,
    pub input_container: Option<String>,
}

impl TaskFixture {
    pub fn new(n: u32, operation: &str) -> Self {
        Self {
            uri: format!("http://redpencil.data.gift/id/task/{n}"),
            id: format!("task-{n}"),
            operation: operation.to_string(),
            status: status::SCHEDULED.to_string(),
            input_container: Some(format!("http://redpencil.data.gift/id/dataContainers/input-{n}")),
        }
    }

    pub fn without_input(mut self) -> Self {
        self.input_container = None;
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn container(&self) -> &str {
        self.input_container.as_deref().unwrap()
    }

    /// Task record in the task graph
    pub fn seed(&self, store: &MemoryStore) {
        let mut ttl = format!(
            r#"
            @prefix task: <http://redpencil.data.gift/vocabularies/tasks/> .
            @prefix dct: <http://purl.org/dc/terms/> .
            @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
            @prefix adms: <http://www.w3.org/ns/adms#> .
            <{uri}> a task:Task ;
                mu:uuid "{id}" ;
                dct:isPartOf <{JOB}> ;
                dct:created "2024-05-01T10:00:00Z" ;
                dct:modified "2024-05-01T10:00:00Z" ;
                adms:status <{status}> ;
                task:index "1" ;
                task:operation <{operation}> .
            "#,
            uri = self.uri,
            id = self.id,
            status = self.status,
            operation = self.operation,
        );
        if let Some(container) = &self.input_container {
            ttl.push_str(&format!(
                r#"<{uri}> task:inputContainer <{container}> .
                <{container}> mu:uuid "input-{id}" .
                "#,
                uri = self.uri,
                id = self.id,
            ));
        }
        store.load_graph(named(TASK_GRAPH), &turtle(&ttl)).unwrap();
    }

    /// Graph-backed input holding `data`
    pub fn seed_graph_input(&self, store: &MemoryStore, data: &str) {
        let ttl = format!(
            "<{}> <http://redpencil.data.gift/vocabularies/tasks/hasGraph> <{DATA_GRAPH}> .",
            self.container()
        );
        store.load_graph(named(TASK_GRAPH), &turtle(&ttl)).unwrap();
        store.load_graph(named(DATA_GRAPH), &turtle(data)).unwrap();
    }

    /// File-backed input: one file per `(name, derived_from, content)`
    pub fn seed_file_input(&self, store: &MemoryStore, share: &Path, files: &[(&str, &str, &str)]) {
        std::fs::create_dir_all(share).unwrap();
        let mut ttl = String::from(
            "@prefix task: <http://redpencil.data.gift/vocabularies/tasks/> .\n\
             @prefix nie: <http://www.semanticdesktop.org/ontologies/2007/01/19/nie#> .\n\
             @prefix prov: <http://www.w3.org/ns/prov#> .\n",
        );
        for (i, (name, derived_from, content)) in files.iter().enumerate() {
            std::fs::write(share.join(name), content).unwrap();
            let logical = format!("http://data.lblod.info/id/files/input-{}-{i}", self.id);
            ttl.push_str(&format!(
                "<{container}> task:hasFile <{logical}> .\n\
                 <share://{name}> nie:dataSource <{logical}> .\n\
                 <{logical}> prov:wasDerivedFrom <{derived_from}> .\n",
                container = self.container(),
            ));
        }
        store.load_graph(named(TASK_GRAPH), &turtle(&ttl)).unwrap();
    }
}
