//! Graph helpers: parsing, N-Triples output and statement-set algebra

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, Subject, SubjectRef, Term, TermRef, Triple};

use crate::error::{Result, ShaclError};

/// Parse Turtle into a graph; named graphs are rejected
pub fn parse_turtle(input: &[u8]) -> Result<Graph> {
    parse(input, RdfFormat::Turtle)
}

/// Parse N-Triples into a graph
pub fn parse_ntriples(input: &[u8]) -> Result<Graph> {
    parse(input, RdfFormat::NTriples)
}

fn parse(input: &[u8], format: RdfFormat) -> Result<Graph> {
    let mut graph = Graph::new();
    for quad in RdfParser::from_format(format)
        .without_named_graphs()
        .for_reader(input)
    {
        let quad = quad.map_err(|e| ShaclError::Parse(e.to_string()))?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

/// Serialize as N-Triples (valid Turtle), one statement per line, sorted
#[must_use]
pub fn to_ntriples(graph: &Graph) -> String {
    let mut lines: Vec<String> = graph.iter().map(|t| format!("{t} .")).collect();
    lines.sort_unstable();
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Statements of `left` absent from `right`
#[must_use]
pub fn difference(left: &Graph, right: &Graph) -> Graph {
    left.iter().filter(|t| !right.contains(*t)).collect()
}

/// All statements of both graphs
#[must_use]
pub fn union(left: &Graph, right: &Graph) -> Graph {
    let mut out = left.clone();
    for triple in right {
        out.insert(triple);
    }
    out
}

/// Term usable as a subject, if any
#[must_use]
pub fn as_subject(term: &Term) -> Option<Subject> {
    match term {
        Term::NamedNode(node) => Some(Subject::NamedNode(node.clone())),
        Term::BlankNode(node) => Some(Subject::BlankNode(node.clone())),
        _ => None,
    }
}

/// Borrowed variant of [`as_subject`]
#[must_use]
pub fn as_subject_ref(term: TermRef<'_>) -> Option<SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(SubjectRef::NamedNode(node)),
        TermRef::BlankNode(node) => Some(SubjectRef::BlankNode(node)),
        _ => None,
    }
}

/// Subject as a term
#[must_use]
pub fn subject_term(subject: SubjectRef<'_>) -> Term {
    Term::from(subject.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DATA: &str = r#"
        @prefix ex: <http://ex.org/> .
        ex:a ex:p "1" ; ex:q ex:b .
        ex:b ex:p "2" .
    "#;

    #[test]
    fn parses_turtle_and_prints_sorted_ntriples() {
        let graph = parse_turtle(DATA.as_bytes()).unwrap();
        assert_eq!(graph.len(), 3);
        let nt = to_ntriples(&graph);
        assert_eq!(
            nt,
            "<http://ex.org/a> <http://ex.org/p> \"1\" .\n\
             <http://ex.org/a> <http://ex.org/q> <http://ex.org/b> .\n\
             <http://ex.org/b> <http://ex.org/p> \"2\" .\n"
        );
        assert_eq!(parse_ntriples(nt.as_bytes()).unwrap(), graph);
    }

    #[test]
    fn difference_and_union_partition() {
        let all = parse_turtle(DATA.as_bytes()).unwrap();
        let part = parse_turtle(b"<http://ex.org/b> <http://ex.org/p> \"2\" .").unwrap();
        let rest = difference(&all, &part);
        assert_eq!(rest.len(), 2);
        assert_eq!(union(&rest, &part), all);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_turtle(b"this is not turtle"),
            Err(ShaclError::Parse(_))
        ));
    }
}
