//! Blank node skolemization

use oxigraph::model::{Graph, NamedNode, Subject, SubjectRef, Term, TermRef, Triple};

/// Rewrite every blank subject and object to `{prefix}{label}`.
///
/// Distinct labels map to distinct IRIs, and a graph without blank nodes is
/// returned unchanged.
#[must_use]
pub fn replace_blank_nodes(graph: &Graph, prefix: &str) -> Graph {
    let mut out = Graph::new();
    for triple in graph {
        let subject = match triple.subject {
            SubjectRef::BlankNode(b) => Subject::NamedNode(skolem(prefix, b.as_str())),
            other => other.into_owned(),
        };
        let object = match triple.object {
            TermRef::BlankNode(b) => Term::NamedNode(skolem(prefix, b.as_str())),
            other => other.into_owned(),
        };
        out.insert(&Triple::new(subject, triple.predicate.into_owned(), object));
    }
    out
}

fn skolem(prefix: &str, label: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{prefix}{label}"))
}
