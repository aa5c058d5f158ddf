//! Validation reports and their RDF form

use oxigraph::model::{BlankNode, Graph, Literal, NamedNode, NamedNodeRef, Term, Triple};

use crate::compile::{PropertyPath, Severity};
use crate::vocab::{rdf, sh};

/// SHACL validation report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when no result was produced
    pub conforms: bool,
    /// Individual results, sorted
    pub results: Vec<ValidationResult>,
}

/// Individual validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// The focus node that was validated
    pub focus_node: Term,
    /// The property path, for property-shape results
    pub result_path: Option<PropertyPath>,
    /// The value that caused the violation, if any
    pub value: Option<Term>,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// The constraint component that produced this result
    pub source_constraint: NamedNode,
    /// The shape that produced this result
    pub source_shape: Term,
}

impl ValidationResult {
    fn sort_key(&self) -> (String, String, String, &str, &str, Severity, String) {
        (
            self.focus_node.to_string(),
            self.result_path.as_ref().map(|p| format!("{p:?}")).unwrap_or_default(),
            self.value.as_ref().map(ToString::to_string).unwrap_or_default(),
            self.source_constraint.as_str(),
            &self.message,
            self.severity,
            self.source_shape.to_string(),
        )
    }
}

impl ValidationReport {
    /// Create an empty conforming report
    #[must_use]
    pub fn conforming() -> Self {
        Self {
            conforms: true,
            results: Vec::new(),
        }
    }

    /// Build a report; results are sorted so equal inputs give equal reports
    #[must_use]
    pub fn from_results(mut results: Vec<ValidationResult>) -> Self {
        results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        results.dedup();
        Self {
            conforms: results.is_empty(),
            results,
        }
    }

    /// Count results of `Severity::Violation`
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Violation)
            .count()
    }

    /// `sh:ValidationReport` graph.
    ///
    /// The report and result nodes are fresh blank nodes, so reports from
    /// different runs never share node identity.
    #[must_use]
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        let report = BlankNode::default();
        insert(&mut graph, &report, rdf::TYPE, sh::VALIDATION_REPORT.into_owned());
        insert(&mut graph, &report, sh::CONFORMS, Literal::from(self.conforms));
        for result in &self.results {
            let node = BlankNode::default();
            insert(&mut graph, &report, sh::RESULT, node.clone());
            insert(&mut graph, &node, rdf::TYPE, sh::VALIDATION_RESULT.into_owned());
            insert(&mut graph, &node, sh::FOCUS_NODE, result.focus_node.clone());
            insert(
                &mut graph,
                &node,
                sh::RESULT_MESSAGE,
                Literal::new_simple_literal(&result.message),
            );
            insert(&mut graph, &node, sh::RESULT_SEVERITY, result.severity.iri().into_owned());
            insert(
                &mut graph,
                &node,
                sh::SOURCE_CONSTRAINT_COMPONENT,
                result.source_constraint.clone(),
            );
            if let Term::NamedNode(shape) = &result.source_shape {
                insert(&mut graph, &node, sh::SOURCE_SHAPE, shape.clone());
            }
            if let Some(value) = &result.value {
                insert(&mut graph, &node, sh::VALUE, value.clone());
            }
            match &result.result_path {
                Some(PropertyPath::Predicate(p)) => {
                    insert(&mut graph, &node, sh::RESULT_PATH, p.clone());
                }
                Some(PropertyPath::Inverse(p)) => {
                    let path = BlankNode::default();
                    insert(&mut graph, &node, sh::RESULT_PATH, path.clone());
                    insert(&mut graph, &path, sh::INVERSE_PATH, p.clone());
                }
                None => {}
            }
        }
        graph
    }
}

fn insert(graph: &mut Graph, subject: &BlankNode, predicate: NamedNodeRef<'_>, object: impl Into<Term>) {
    graph.insert(&Triple::new(subject.clone(), predicate.into_owned(), object));
}
