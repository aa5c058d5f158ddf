//! Shape compilation
//!
//! Reads a shapes graph into [`CompiledShape`]s. Supported: node shapes with
//! explicit or implicit class targets, `sh:property` with predicate or
//! inverse paths, standalone targeted property shapes, the constraints in
//! [`Constraint`], `sh:closed`/`sh:ignoredProperties`, `sh:severity`,
//! `sh:message` and `sh:deactivated`.

use std::collections::{BTreeSet, HashSet};

use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, SubjectRef, Term, TermRef, TripleRef};

use crate::constraints::string::compile_pattern;
use crate::constraints::Constraint;
use crate::error::{Result, ShaclError};
use crate::rdf::{as_subject_ref, subject_term};
use crate::vocab::{rdf, rdfs, sh};

/// How a shape selects its focus nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    /// sh:targetClass, or a shape that is also an `rdfs:Class`
    Class(NamedNode),
    /// sh:targetNode
    Node(Term),
    /// sh:targetSubjectsOf
    SubjectsOf(NamedNode),
    /// sh:targetObjectsOf
    ObjectsOf(NamedNode),
}

/// Severity level for constraint violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// sh:Violation
    #[default]
    Violation,
    /// sh:Warning
    Warning,
    /// sh:Info
    Info,
}

impl Severity {
    /// IRI used in report graphs
    #[must_use]
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Violation => sh::VIOLATION,
            Self::Warning => sh::WARNING,
            Self::Info => sh::INFO,
        }
    }

    fn parse(term: Option<TermRef<'_>>) -> Self {
        match term {
            Some(TermRef::NamedNode(n)) if n == sh::WARNING => Self::Warning,
            Some(TermRef::NamedNode(n)) if n == sh::INFO => Self::Info,
            _ => Self::Violation,
        }
    }
}

/// sh:nodeKind values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// sh:IRI
    Iri,
    /// sh:BlankNode
    BlankNode,
    /// sh:Literal
    Literal,
    /// sh:BlankNodeOrIRI
    BlankNodeOrIri,
    /// sh:BlankNodeOrLiteral
    BlankNodeOrLiteral,
    /// sh:IRIOrLiteral
    IriOrLiteral,
}

impl NodeKind {
    /// True when `term` has this kind
    #[must_use]
    pub fn matches(self, term: &Term) -> bool {
        let (iri, blank, literal) = match term {
            Term::NamedNode(_) => (true, false, false),
            Term::BlankNode(_) => (false, true, false),
            Term::Literal(_) => (false, false, true),
            _ => (false, false, false),
        };
        match self {
            Self::Iri => iri,
            Self::BlankNode => blank,
            Self::Literal => literal,
            Self::BlankNodeOrIri => blank || iri,
            Self::BlankNodeOrLiteral => blank || literal,
            Self::IriOrLiteral => iri || literal,
        }
    }

    fn parse(node: NamedNodeRef<'_>) -> Option<Self> {
        Some(match node {
            n if n == sh::IRI => Self::Iri,
            n if n == sh::BLANK_NODE => Self::BlankNode,
            n if n == sh::LITERAL => Self::Literal,
            n if n == sh::BLANK_NODE_OR_IRI => Self::BlankNodeOrIri,
            n if n == sh::BLANK_NODE_OR_LITERAL => Self::BlankNodeOrLiteral,
            n if n == sh::IRI_OR_LITERAL => Self::IriOrLiteral,
            _ => return None,
        })
    }
}

/// Property path (predicate or inverse predicate)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyPath {
    /// `sh:path ex:p`
    Predicate(NamedNode),
    /// `sh:path [ sh:inversePath ex:p ]`
    Inverse(NamedNode),
}

impl PropertyPath {
    /// Underlying predicate
    #[must_use]
    pub fn predicate(&self) -> &NamedNode {
        match self {
            Self::Predicate(p) | Self::Inverse(p) => p,
        }
    }
}

/// A compiled property shape
#[derive(Debug, Clone)]
pub struct PropertyShape {
    /// Shape node in the shapes graph
    pub id: Term,
    /// Property path
    pub path: PropertyPath,
    /// Constraints on the path's value nodes
    pub constraints: Vec<Constraint>,
    /// Severity of reported results
    pub severity: Severity,
    /// sh:message override
    pub message: Option<String>,
}

/// `sh:closed true` settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosedSpec {
    /// Predicates declared through property shapes plus sh:ignoredProperties
    pub allowed: HashSet<NamedNode>,
}

/// A compiled node shape
#[derive(Debug, Clone)]
pub struct CompiledShape {
    /// Shape node in the shapes graph
    pub id: Term,
    /// Focus node selection
    pub targets: Vec<TargetType>,
    /// Property shapes
    pub property_shapes: Vec<PropertyShape>,
    /// Constraints on the focus node itself
    pub node_constraints: Vec<Constraint>,
    /// Present when the shape is closed
    pub closed: Option<ClosedSpec>,
    /// Severity of node-level results
    pub severity: Severity,
    /// sh:message override
    pub message: Option<String>,
}

impl CompiledShape {
    /// Check if this shape has any targets
    #[must_use]
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// Compile every active shape in a shapes graph.
///
/// Shapes are returned in a stable order (sorted by their identifier).
pub fn compile(shapes: &Graph) -> Result<Vec<CompiledShape>> {
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    let mut nodes = Vec::new();
    let mut push = |node: SubjectRef<'_>, nodes: &mut Vec<Term>| {
        let term = subject_term(node);
        if candidates.insert(term.to_string()) {
            nodes.push(term);
        }
    };

    for node in shapes.subjects_for_predicate_object(rdf::TYPE, sh::NODE_SHAPE) {
        push(node, &mut nodes);
    }
    for target in [
        sh::TARGET_CLASS,
        sh::TARGET_NODE,
        sh::TARGET_SUBJECTS_OF,
        sh::TARGET_OBJECTS_OF,
    ] {
        for triple in shapes.triples_for_predicate(target) {
            push(triple.subject, &mut nodes);
        }
    }
    for triple in shapes.triples_for_predicate(sh::PROPERTY) {
        push(triple.subject, &mut nodes);
    }

    let mut compiled = Vec::new();
    for node in nodes {
        let Some(subject) = as_subject_ref(node.as_ref()) else {
            continue;
        };
        if is_true(shapes.object_for_subject_predicate(subject, sh::DEACTIVATED)) {
            tracing::debug!(shape = %node, "skipping deactivated shape");
            continue;
        }
        if shapes.object_for_subject_predicate(subject, sh::PATH).is_some() {
            // standalone property shape with its own targets
            let property = compile_property_shape(shapes, subject)?;
            compiled.push(CompiledShape {
                id: node.clone(),
                targets: targets(shapes, subject)?,
                property_shapes: vec![property],
                node_constraints: Vec::new(),
                closed: None,
                severity: Severity::parse(shapes.object_for_subject_predicate(subject, sh::SEVERITY)),
                message: string_value(shapes, subject, sh::MESSAGE),
            });
        } else {
            compiled.push(compile_node_shape(shapes, subject, node.clone())?);
        }
    }
    compiled.sort_by_key(|shape| shape.id.to_string());
    tracing::debug!(shapes = compiled.len(), "compiled shapes graph");
    Ok(compiled)
}

fn compile_node_shape(shapes: &Graph, subject: SubjectRef<'_>, id: Term) -> Result<CompiledShape> {
    let mut property_shapes = Vec::new();
    for property in shapes.objects_for_subject_predicate(subject, sh::PROPERTY) {
        let Some(property) = as_subject_ref(property) else {
            return Err(compilation_error(&id, "sh:property must point to a node"));
        };
        if is_true(shapes.object_for_subject_predicate(property, sh::DEACTIVATED)) {
            continue;
        }
        property_shapes.push(compile_property_shape(shapes, property)?);
    }
    property_shapes.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.to_string().cmp(&b.id.to_string())));

    let closed = if is_true(shapes.object_for_subject_predicate(subject, sh::CLOSED)) {
        let mut allowed: HashSet<NamedNode> = property_shapes
            .iter()
            .filter_map(|p| match &p.path {
                PropertyPath::Predicate(pred) => Some(pred.clone()),
                PropertyPath::Inverse(_) => None,
            })
            .collect();
        if let Some(head) = shapes.object_for_subject_predicate(subject, sh::IGNORED_PROPERTIES) {
            for item in read_list(shapes, head)? {
                if let Term::NamedNode(pred) = item {
                    allowed.insert(pred);
                }
            }
        }
        Some(ClosedSpec { allowed })
    } else {
        None
    };

    Ok(CompiledShape {
        targets: targets(shapes, subject)?,
        property_shapes,
        node_constraints: constraints(shapes, subject, &id)?,
        closed,
        severity: Severity::parse(shapes.object_for_subject_predicate(subject, sh::SEVERITY)),
        message: string_value(shapes, subject, sh::MESSAGE),
        id,
    })
}

fn compile_property_shape(shapes: &Graph, subject: SubjectRef<'_>) -> Result<PropertyShape> {
    let id = subject_term(subject);
    let path = match shapes.object_for_subject_predicate(subject, sh::PATH) {
        Some(TermRef::NamedNode(p)) => PropertyPath::Predicate(p.into_owned()),
        Some(TermRef::BlankNode(b)) => match shapes.object_for_subject_predicate(b, sh::INVERSE_PATH) {
            Some(TermRef::NamedNode(p)) => PropertyPath::Inverse(p.into_owned()),
            _ => return Err(ShaclError::UnsupportedPath { shape: id.to_string() }),
        },
        Some(_) => return Err(ShaclError::UnsupportedPath { shape: id.to_string() }),
        None => return Err(compilation_error(&id, "property shape without sh:path")),
    };
    Ok(PropertyShape {
        constraints: constraints(shapes, subject, &id)?,
        severity: Severity::parse(shapes.object_for_subject_predicate(subject, sh::SEVERITY)),
        message: string_value(shapes, subject, sh::MESSAGE),
        path,
        id,
    })
}

fn targets(shapes: &Graph, subject: SubjectRef<'_>) -> Result<Vec<TargetType>> {
    let mut targets = Vec::new();
    for class in shapes.objects_for_subject_predicate(subject, sh::TARGET_CLASS) {
        targets.push(TargetType::Class(named(class, subject, "sh:targetClass")?));
    }
    for node in shapes.objects_for_subject_predicate(subject, sh::TARGET_NODE) {
        targets.push(TargetType::Node(node.into_owned()));
    }
    for p in shapes.objects_for_subject_predicate(subject, sh::TARGET_SUBJECTS_OF) {
        targets.push(TargetType::SubjectsOf(named(p, subject, "sh:targetSubjectsOf")?));
    }
    for p in shapes.objects_for_subject_predicate(subject, sh::TARGET_OBJECTS_OF) {
        targets.push(TargetType::ObjectsOf(named(p, subject, "sh:targetObjectsOf")?));
    }
    if let SubjectRef::NamedNode(iri) = subject {
        if shapes.contains(TripleRef::new(subject, rdf::TYPE, rdfs::CLASS)) {
            targets.push(TargetType::Class(iri.into_owned()));
        }
    }
    Ok(targets)
}

fn constraints(shapes: &Graph, subject: SubjectRef<'_>, id: &Term) -> Result<Vec<Constraint>> {
    let mut out = Vec::new();
    let count = |p: NamedNodeRef<'_>| -> Result<Option<usize>> {
        shapes
            .object_for_subject_predicate(subject, p)
            .map(|t| integer(t, id, p))
            .transpose()
    };
    if let Some(n) = count(sh::MIN_COUNT)? {
        out.push(Constraint::MinCount(n));
    }
    if let Some(n) = count(sh::MAX_COUNT)? {
        out.push(Constraint::MaxCount(n));
    }
    if let Some(dt) = shapes.object_for_subject_predicate(subject, sh::DATATYPE) {
        out.push(Constraint::Datatype(named(dt, subject, "sh:datatype")?));
    }
    for class in shapes.objects_for_subject_predicate(subject, sh::CLASS) {
        out.push(Constraint::Class(named(class, subject, "sh:class")?));
    }
    if let Some(kind) = shapes.object_for_subject_predicate(subject, sh::NODE_KIND) {
        let kind = match kind {
            TermRef::NamedNode(n) => NodeKind::parse(n),
            _ => None,
        }
        .ok_or_else(|| compilation_error(id, "unknown sh:nodeKind"))?;
        out.push(Constraint::NodeKind(kind));
    }
    if let Some(pattern) = string_value(shapes, subject, sh::PATTERN) {
        let flags = string_value(shapes, subject, sh::FLAGS);
        let regex = compile_pattern(&pattern, flags.as_deref())?;
        out.push(Constraint::Pattern {
            source: pattern,
            regex,
        });
    }
    if let Some(n) = count(sh::MIN_LENGTH)? {
        out.push(Constraint::MinLength(n));
    }
    if let Some(n) = count(sh::MAX_LENGTH)? {
        out.push(Constraint::MaxLength(n));
    }
    let bounds: [(NamedNodeRef<'_>, fn(Literal) -> Constraint); 4] = [
        (sh::MIN_INCLUSIVE, Constraint::MinInclusive),
        (sh::MAX_INCLUSIVE, Constraint::MaxInclusive),
        (sh::MIN_EXCLUSIVE, Constraint::MinExclusive),
        (sh::MAX_EXCLUSIVE, Constraint::MaxExclusive),
    ];
    for (predicate, build) in bounds {
        match shapes.object_for_subject_predicate(subject, predicate) {
            Some(TermRef::Literal(l)) => out.push(build(l.into_owned())),
            Some(_) => return Err(compilation_error(id, "range bound must be a literal")),
            None => {}
        }
    }
    if let Some(head) = shapes.object_for_subject_predicate(subject, sh::IN) {
        out.push(Constraint::In(read_list(shapes, head)?));
    }
    for value in shapes.objects_for_subject_predicate(subject, sh::HAS_VALUE) {
        out.push(Constraint::HasValue(value.into_owned()));
    }
    Ok(out)
}

/// Members of an RDF collection
pub(crate) fn read_list(graph: &Graph, head: TermRef<'_>) -> Result<Vec<Term>> {
    let mut items = Vec::new();
    let mut current = head;
    let mut seen = HashSet::new();
    while current != TermRef::NamedNode(rdf::NIL) {
        let Some(node) = as_subject_ref(current) else {
            return Err(ShaclError::MalformedList(head.to_string()));
        };
        if !seen.insert(node) {
            return Err(ShaclError::MalformedList(head.to_string()));
        }
        let first = graph
            .object_for_subject_predicate(node, rdf::FIRST)
            .ok_or_else(|| ShaclError::MalformedList(head.to_string()))?;
        items.push(first.into_owned());
        current = graph
            .object_for_subject_predicate(node, rdf::REST)
            .ok_or_else(|| ShaclError::MalformedList(head.to_string()))?;
    }
    Ok(items)
}

fn is_true(term: Option<TermRef<'_>>) -> bool {
    matches!(term, Some(TermRef::Literal(l)) if l.value() == "true" || l.value() == "1")
}

fn string_value(shapes: &Graph, subject: SubjectRef<'_>, predicate: NamedNodeRef<'_>) -> Option<String> {
    match shapes.object_for_subject_predicate(subject, predicate)? {
        TermRef::Literal(l) => Some(l.value().to_string()),
        _ => None,
    }
}

fn integer(term: TermRef<'_>, id: &Term, predicate: NamedNodeRef<'_>) -> Result<usize> {
    match term {
        TermRef::Literal(l) => l
            .value()
            .parse()
            .map_err(|_| compilation_error(id, &format!("{predicate} must be a non-negative integer"))),
        _ => Err(compilation_error(id, &format!("{predicate} must be a literal"))),
    }
}

fn named(term: TermRef<'_>, subject: SubjectRef<'_>, what: &str) -> Result<NamedNode> {
    match term {
        TermRef::NamedNode(n) => Ok(n.into_owned()),
        _ => Err(ShaclError::Compilation {
            shape: subject.to_string(),
            message: format!("{what} must be an IRI"),
        }),
    }
}

fn compilation_error(id: &Term, message: &str) -> ShaclError {
    ShaclError::Compilation {
        shape: id.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::parse_turtle;

    const SHAPES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://ex.org/> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

        ex:PersonShape a sh:NodeShape ;
            sh:targetClass ex:Person ;
            sh:closed true ;
            sh:ignoredProperties ( <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ) ;
            sh:property [
                sh:path ex:name ;
                sh:minCount 1 ;
                sh:maxCount 1 ;
                sh:datatype xsd:string ;
                sh:pattern "^[A-Z]" ;
            ] ;
            sh:property [
                sh:path [ sh:inversePath ex:knows ] ;
                sh:nodeKind sh:IRI ;
            ] .

        ex:Off a sh:NodeShape ; sh:targetClass ex:Thing ; sh:deactivated true .

        ex:AgeShape a sh:PropertyShape ;
            sh:targetSubjectsOf ex:age ;
            sh:path ex:age ;
            sh:in ( 1 2 3 ) ;
            sh:severity sh:Warning .
    "#;

    #[test]
    fn compiles_node_and_property_shapes() {
        let shapes = compile(&parse_turtle(SHAPES.as_bytes()).unwrap()).unwrap();
        assert_eq!(shapes.len(), 2);

        let age = &shapes[0];
        assert_eq!(age.id.to_string(), "<http://ex.org/AgeShape>");
        assert_eq!(age.severity, Severity::Warning);
        assert!(matches!(age.property_shapes[0].constraints[0], Constraint::In(ref v) if v.len() == 3));

        let person = &shapes[1];
        assert_eq!(
            person.targets,
            vec![TargetType::Class(NamedNode::new_unchecked("http://ex.org/Person"))]
        );
        assert_eq!(person.property_shapes.len(), 2);
        assert!(person
            .property_shapes
            .iter()
            .any(|p| matches!(p.path, PropertyPath::Inverse(_))));
        let closed = person.closed.as_ref().unwrap();
        assert!(closed.allowed.contains(&NamedNode::new_unchecked("http://ex.org/name")));
        assert!(closed.allowed.contains(&rdf::TYPE.into_owned()));
    }

    #[test]
    fn rejects_sequence_paths() {
        let shapes = parse_turtle(
            br#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            @prefix ex: <http://ex.org/> .
            ex:S sh:targetClass ex:A ; sh:property [ sh:path ( ex:a ex:b ) ] .
            "#,
        )
        .unwrap();
        assert!(matches!(compile(&shapes), Err(ShaclError::UnsupportedPath { .. })));
    }

    #[test]
    fn rejects_invalid_counts() {
        let shapes = parse_turtle(
            br#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            @prefix ex: <http://ex.org/> .
            ex:S sh:targetClass ex:A ; sh:property [ sh:path ex:a ; sh:minCount "many" ] .
            "#,
        )
        .unwrap();
        assert!(matches!(compile(&shapes), Err(ShaclError::Compilation { .. })));
    }
}
