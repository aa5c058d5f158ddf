//! Value type validators (sh:datatype, sh:class, sh:nodeKind)

use std::collections::HashSet;

use oxigraph::model::{Graph, NamedNodeRef, SubjectRef, Term, TermRef};

use super::ConstraintViolation;
use crate::compile::NodeKind;
use crate::rdf::as_subject_ref;
use crate::vocab::{rdf, rdfs};

/// Validate sh:datatype
#[must_use]
pub fn validate_datatype(value: &Term, datatype: NamedNodeRef<'_>) -> Option<ConstraintViolation> {
    match value {
        Term::Literal(literal) if literal.datatype() == datatype => None,
        _ => Some(ConstraintViolation::on_value(
            value,
            format!("Value does not have datatype {datatype}"),
        )),
    }
}

/// Validate sh:class
#[must_use]
pub fn validate_class(
    value: &Term,
    class: NamedNodeRef<'_>,
    data: &Graph,
) -> Option<ConstraintViolation> {
    let is_instance = as_subject_ref(value.as_ref())
        .is_some_and(|node| is_instance_of(data, node, class));
    (!is_instance).then(|| {
        ConstraintViolation::on_value(value, format!("Value is not an instance of {class}"))
    })
}

/// Validate sh:nodeKind
#[must_use]
pub fn validate_node_kind(value: &Term, kind: NodeKind) -> Option<ConstraintViolation> {
    (!kind.matches(value)).then(|| {
        ConstraintViolation::on_value(value, format!("Value does not have node kind {kind:?}"))
    })
}

/// `node rdf:type/rdfs:subClassOf* class` in the data graph
pub(crate) fn is_instance_of(data: &Graph, node: SubjectRef<'_>, class: NamedNodeRef<'_>) -> bool {
    let mut seen = HashSet::new();
    let mut pending: Vec<TermRef<'_>> = data
        .objects_for_subject_predicate(node, rdf::TYPE)
        .collect();
    while let Some(current) = pending.pop() {
        if current == TermRef::NamedNode(class) {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(subject) = as_subject_ref(current) {
            pending.extend(data.objects_for_subject_predicate(subject, rdfs::SUB_CLASS_OF));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::parse_turtle;
    use oxigraph::model::{Literal, NamedNode};
    use oxigraph::model::vocab::xsd;

    #[test]
    fn datatype_matches_literal_type() {
        let v = Term::from(Literal::from(3_i64));
        assert!(validate_datatype(&v, xsd::INTEGER).is_none());
        assert!(validate_datatype(&v, xsd::STRING).is_some());
        let iri = Term::from(NamedNode::new_unchecked("http://ex.org/a"));
        assert!(validate_datatype(&iri, xsd::STRING).is_some());
    }

    #[test]
    fn class_follows_subclass_chain() {
        let data = parse_turtle(
            br#"
            @prefix ex: <http://ex.org/> .
            @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
            ex:a a ex:Dog .
            ex:Dog rdfs:subClassOf ex:Animal .
            ex:Animal rdfs:subClassOf ex:Dog .
            "#,
        )
        .unwrap();
        let a = Term::from(NamedNode::new_unchecked("http://ex.org/a"));
        assert!(validate_class(&a, NamedNodeRef::new_unchecked("http://ex.org/Animal"), &data).is_none());
        assert!(validate_class(&a, NamedNodeRef::new_unchecked("http://ex.org/Cat"), &data).is_some());
    }

    #[test]
    fn node_kind() {
        let lit = Term::from(Literal::new_simple_literal("x"));
        assert!(validate_node_kind(&lit, NodeKind::Literal).is_none());
        assert!(validate_node_kind(&lit, NodeKind::BlankNodeOrIri).is_some());
    }
}
