//! Validation/filter engine bound to one shape profile

use std::path::Path;
use std::sync::Arc;

use oxigraph::model::{Graph, NamedNode};

use crate::compile::{compile, CompiledShape};
use crate::error::{Result, ShaclError};
use crate::rdf::{difference, parse_turtle};
use crate::report::ValidationReport;
use crate::{blank, filter, validate};

/// Prefix used when skolemizing report blank nodes
pub const DEFAULT_BLANK_PREFIX: &str = "http://mu.semte.ch/blank#";

/// Result of validating and splitting one graph
#[derive(Debug, Clone)]
pub struct Partition {
    /// Validation report
    pub report: ValidationReport,
    /// Statements that violate no shape
    pub conforming: Graph,
    /// The remaining statements of the input
    pub errored: Graph,
}

/// SHACL engine holding a compiled shape profile.
///
/// Cheap to clone; the compiled shapes are shared.
#[derive(Debug, Clone)]
pub struct ShaclEngine {
    shapes: Arc<Vec<CompiledShape>>,
    blank_prefix: String,
}

impl ShaclEngine {
    /// Engine from already compiled shapes
    #[must_use]
    pub fn new(shapes: Vec<CompiledShape>) -> Self {
        Self {
            shapes: Arc::new(shapes),
            blank_prefix: DEFAULT_BLANK_PREFIX.to_string(),
        }
    }

    /// Compile a shapes graph
    pub fn from_graph(shapes: &Graph) -> Result<Self> {
        Ok(Self::new(compile(shapes)?))
    }

    /// Compile a Turtle shape profile
    pub fn from_turtle(input: &str) -> Result<Self> {
        Self::from_graph(&parse_turtle(input.as_bytes())?)
    }

    /// Read and compile a Turtle shape profile from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let engine = Self::from_graph(&parse_turtle(&bytes)?)?;
        tracing::info!(path = %path.display(), shapes = engine.shape_count(), "loaded shape profile");
        Ok(engine)
    }

    /// Use another skolemization prefix (must be an absolute IRI)
    pub fn with_blank_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        NamedNode::new(prefix.as_str()).map_err(|e| ShaclError::Compilation {
            shape: "<engine>".into(),
            message: format!("invalid blank node prefix '{prefix}': {e}"),
        })?;
        self.blank_prefix = prefix;
        Ok(self)
    }

    /// Number of active shapes
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Validate a data graph
    #[must_use]
    pub fn validate(&self, graph: &Graph) -> ValidationReport {
        validate::validate(&self.shapes, graph)
    }

    /// Conforming subset of `graph` according to `report`
    #[must_use]
    pub fn filter(&self, graph: &Graph, report: &ValidationReport) -> Graph {
        filter::filter(graph, report)
    }

    /// Skolemize blank nodes with the engine's prefix
    #[must_use]
    pub fn replace_blank_nodes(&self, graph: &Graph) -> Graph {
        blank::replace_blank_nodes(graph, &self.blank_prefix)
    }

    /// Validate, then split the input into conforming and errored statements.
    ///
    /// Both parts are computed on the input graph as given, before any
    /// blank node rewriting.
    #[must_use]
    pub fn partition(&self, graph: &Graph) -> Partition {
        let report = self.validate(graph);
        let conforming = self.filter(graph, &report);
        let errored = difference(graph, &conforming);
        tracing::debug!(
            conforms = report.conforms,
            results = report.results.len(),
            conforming = conforming.len(),
            errored = errored.len(),
            "partitioned graph"
        );
        Partition {
            report,
            conforming,
            errored,
        }
    }

    /// Report graph with blank nodes skolemized, ready to persist
    #[must_use]
    pub fn report_graph(&self, report: &ValidationReport) -> Graph {
        self.replace_blank_nodes(&report.to_graph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_prefix() {
        let engine = ShaclEngine::new(Vec::new());
        assert!(engine.clone().with_blank_prefix("blank:").is_ok());
        assert!(engine.with_blank_prefix("not a prefix").is_err());
    }

    #[test]
    fn report_graph_has_no_blank_nodes() {
        let engine = ShaclEngine::from_turtle(
            r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
               @prefix ex: <http://ex.org/> .
               ex:S sh:targetClass ex:A ; sh:property [ sh:path ex:p ; sh:minCount 1 ] ."#,
        )
        .unwrap();
        let data = parse_turtle(b"<http://ex.org/a> a <http://ex.org/A> .").unwrap();
        let partition = engine.partition(&data);
        assert!(!partition.report.conforms);
        let graph = engine.report_graph(&partition.report);
        assert!(graph
            .iter()
            .all(|t| !t.subject.is_blank_node() && !t.object.is_blank_node()));
    }
}
