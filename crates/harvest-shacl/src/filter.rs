//! Conforming-subgraph computation
//!
//! A result with a path and a value removes that one statement. A result
//! without a path or value (cardinality, node-level checks) removes every
//! statement of its focus node. Removing a statement whose object is a blank
//! node also removes the statements describing that blank node.

use std::collections::HashSet;

use oxigraph::model::{Graph, Subject, SubjectRef, Term, Triple, TripleRef};

use crate::compile::PropertyPath;
use crate::rdf::{as_subject, as_subject_ref, difference};
use crate::report::ValidationReport;

/// Subset of `graph` touched by no result of `report`
#[must_use]
pub fn filter(graph: &Graph, report: &ValidationReport) -> Graph {
    if report.results.is_empty() {
        return graph.clone();
    }
    let removed = offending(graph, report);
    difference(graph, &removed)
}

/// Statements of `graph` implicated by `report`
#[must_use]
pub fn offending(graph: &Graph, report: &ValidationReport) -> Graph {
    let mut removed = Graph::new();
    for result in &report.results {
        let focus = as_subject(&result.focus_node);
        match (&result.result_path, &result.value) {
            (Some(PropertyPath::Predicate(p)), Some(value)) => {
                if let Some(focus) = &focus {
                    let triple = Triple::new(focus.clone(), p.clone(), value.clone());
                    remove(graph, triple.as_ref(), &mut removed);
                }
            }
            (Some(PropertyPath::Inverse(p)), Some(value)) => {
                if let Some(subject) = as_subject(value) {
                    let triple = Triple::new(subject, p.clone(), result.focus_node.clone());
                    remove(graph, triple.as_ref(), &mut removed);
                }
            }
            _ => {
                if let Some(focus) = &focus {
                    remove_subject(graph, focus, &mut removed);
                }
            }
        }
    }
    removed
}

fn remove(graph: &Graph, triple: TripleRef<'_>, removed: &mut Graph) {
    if !graph.contains(triple) {
        return;
    }
    removed.insert(triple);
    if let Term::BlankNode(node) = triple.object.into_owned() {
        remove_subject(graph, &Subject::BlankNode(node), removed);
    }
}

fn remove_subject(graph: &Graph, subject: &Subject, removed: &mut Graph) {
    let mut pending: Vec<SubjectRef<'_>> = vec![subject.as_ref()];
    let mut seen: HashSet<SubjectRef<'_>> = HashSet::new();
    while let Some(current) = pending.pop() {
        if !seen.insert(current) {
            continue;
        }
        for triple in graph.triples_for_subject(current) {
            removed.insert(triple);
            if let Some(object @ SubjectRef::BlankNode(_)) = as_subject_ref(triple.object) {
                pending.push(object);
            }
        }
    }
}
